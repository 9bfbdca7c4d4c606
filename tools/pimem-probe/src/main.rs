mod dump;
mod logger;

use crate::dump::dump;
use crate::logger::StderrLogger;
use log::{error, info};
use pimem_addresses::PhysicalAddress;
use pimem_regions::{
    AccessError, HardwareContext, MemDevice, PeripheralMapping, PeripheralRegion, Region,
    RegionError, UncachedFlags, UncachedRegion,
};
use std::env;
use std::error::Error;
use std::num::ParseIntError;
use std::process::ExitCode;

const USAGE: &str = "\
usage: pimem-probe peripheral <phys> <len> [mem|gpio|<device>]
       pimem-probe uncached <len> [flags]

numbers are decimal or 0x-prefixed hex";

#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("invalid arguments")]
    Usage,
    #[error("invalid number {arg:?}")]
    Number {
        arg: String,
        #[source]
        source: ParseIntError,
    },
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

fn main() -> ExitCode {
    if let Err(e) = StderrLogger::init() {
        eprintln!("logger: {e}");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ProbeError::Usage) => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), ProbeError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["peripheral", phys, len, rest @ ..] if rest.len() <= 1 => {
            let device = match rest.first() {
                None | Some(&"mem") => MemDevice::Full,
                Some(&"gpio") => MemDevice::Gpio,
                Some(path) => MemDevice::Path(path.into()),
            };
            peripheral(PhysicalAddress::new(parse(phys)?), parse(len)?, device)
        }
        ["uncached", len, rest @ ..] if rest.len() <= 1 => {
            let flags = match rest.first() {
                Some(raw) => UncachedFlags::from_bits_retain(parse(raw)?),
                None => UncachedFlags::DIRECT | UncachedFlags::ZERO,
            };
            uncached(parse(len)?, flags)
        }
        _ => Err(ProbeError::Usage),
    }
}

fn peripheral(physical: PhysicalAddress, len: u32, device: MemDevice) -> Result<(), ProbeError> {
    let mut region = PeripheralRegion::new(len)?;
    region.map(PeripheralMapping::new(physical, device))?;
    info!("{region}");

    print!("{}", dump(&region, len as usize)?);
    region.unmap()?;
    Ok(())
}

fn uncached(len: u32, flags: UncachedFlags) -> Result<(), ProbeError> {
    let hardware = HardwareContext::detect();
    let mut region = UncachedRegion::new(&hardware, len)?;
    region.map(flags)?;

    print!("{}", dump(&region, len as usize)?);
    region.unmap()?;
    Ok(())
}

fn parse(arg: &str) -> Result<u32, ProbeError> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|source| ProbeError::Number {
        arg: arg.to_owned(),
        source,
    })
}
