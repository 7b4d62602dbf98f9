// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod check_ops;
pub mod report_ops;
