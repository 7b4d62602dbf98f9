// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fs;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use cpuident::decode::{decode_all, ArchPayload, DecodedIdentity, Purpose};
use cpuident::report;
use cpuident::raw;

use crate::args::{IdentifyArgument, ReportArgument};

fn cache_summary(id: &DecodedIdentity) -> String {
    let mut parts = Vec::new();
    for (name, level) in [
        ("L1d", &id.cache.l1d),
        ("L1i", &id.cache.l1i),
        ("L2", &id.cache.l2),
        ("L3", &id.cache.l3),
        ("L4", &id.cache.l4),
    ] {
        if let Some(size) = level.size {
            match level.instances {
                Some(n) if n > 1 => parts.push(format!("{} {}K x{}", name, size, n)),
                _ => parts.push(format!("{} {}K", name, size)),
            }
        }
    }
    if parts.is_empty() {
        "unknown".to_string()
    } else {
        parts.join(", ")
    }
}

fn print_summary(id: &DecodedIdentity) {
    println!("architecture:  {}", id.architecture);
    println!("vendor:        {} ({})", id.vendor, id.vendor_str);
    if !id.brand_str.is_empty() {
        println!("brand:         {}", id.brand_str);
    }
    println!("codename:      {}", id.codename);
    println!("technology:    {}", id.technology);
    println!("purpose:       {}", id.purpose);
    println!("feature level: {}", id.feature_level);
    println!(
        "topology:      {} cores, {} logical",
        id.num_cores, id.num_logical_cpus
    );
    println!("cache:         {}", cache_summary(id));
    match &id.payload {
        ArchPayload::X86(p) => {
            println!(
                "signature:     family {} model {} stepping {} (ext {}/{})",
                p.family, p.model, p.stepping, p.ext_family, p.ext_model
            );
        }
        ArchPayload::Arm(p) => {
            println!(
                "midr:          implementer 0x{:02x} part 0x{:03x} variant {} revision {}",
                p.implementer, p.part_num, p.variant, p.revision
            );
        }
        ArchPayload::Unknown => {}
    }
    if let Some(hv) = &id.hypervisor {
        println!("hypervisor:    {}", hv);
    }
    let flags: Vec<&str> = id.flags.iter().map(|f| f.name()).collect();
    println!("flags:         {}", flags.join(" "));
}

pub fn handle_identify(args: IdentifyArgument) -> Result<()> {
    let set = raw::load(&args.load)
        .with_context(|| format!("load capture {}", args.load.display()))?;
    let system = decode_all(&set);

    if let Some(purpose) = &args.purpose {
        let purpose = Purpose::from_str(purpose).map_err(|e| anyhow!(e))?;
        let id = system.core_type(purpose)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(id)?);
        } else {
            print_summary(id);
        }
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&system)?);
        return Ok(());
    }
    for (i, id) in system.iter().enumerate() {
        if system.len() > 1 {
            println!("--- CPU type #{} ---", i);
        }
        print_summary(id);
    }
    Ok(())
}

pub fn handle_report(args: ReportArgument) -> Result<()> {
    let set = raw::load(&args.load)
        .with_context(|| format!("load capture {}", args.load.display()))?;
    let system = decode_all(&set);

    if args.architecture {
        let id = system.get(0).ok_or_else(|| anyhow!("empty capture"))?;
        println!("{}", id.architecture);
        return Ok(());
    }

    let fields: Vec<&str> = args.fields.iter().map(String::as_str).collect();
    let text = report::render(&system, &fields)?;
    match &args.outfile {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("write report {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_to_outfile() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.txt");
        fs::write(
            &capture,
            "basic_cpuid[0]=0000000d 756e6547 6c65746e 49656e69\n\
             basic_cpuid[1]=000806ea 00100800 00000201 00000089\n",
        )
        .unwrap();

        let outfile = dir.path().join("report.txt");
        handle_report(ReportArgument {
            load: capture,
            outfile: Some(outfile.clone()),
            architecture: false,
            fields: vec!["architecture".to_string(), "family".to_string()],
        })
        .unwrap();

        let text = fs::read_to_string(&outfile).unwrap();
        assert_eq!(text, "x86\n6\n");
    }
}
