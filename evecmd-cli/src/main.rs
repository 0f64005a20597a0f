// A small host-side utility for poking at an EVE chip attached through an
// Excamera SPIDriver, using the evecmd library crates.

use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use embedded_hal::blocking::delay::DelayMs;
use evecmd::commands::FifoState;
use evecmd::low_level::LowLevel;
use evecmd::memory::MemoryRegion;
use evecmd::models::{Model, BT81x};
use evecmd::registers::Register;
use evecmd::{BootConfig, ClockFrequency, ClockSource, Config, Coprocessor, EVE};
use evecmd_spidriver::EVESPIDriverTransport;
use serial_embedded_hal::{PortSettings, Serial};
use spidriver::SPIDriver;

type MainMem = <BT81x as Model>::MainMem;

// Where the FT81x and BT81x generations keep their four chip ID bytes.
const ROM_CHIPID: u32 = 0x0C0000;

#[derive(Parser, Debug)]
#[command(name = "evecmd", about = "Talk to an EVE display controller through a SPIDriver")]
struct Args {
    /// Serial device the SPIDriver is attached to
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: PathBuf,

    /// Use the chip's internal oscillator instead of an external crystal
    #[arg(long, action = clap::ArgAction::SetTrue)]
    internal_clock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the system clock, wait for boot and print the chip ID
    Probe,
    /// Report whether the coprocessor is busy, and its FIFO offsets
    Status,
    /// Copy a file into graphics RAM and check it with CMD_MEMCRC
    Upload {
        file: PathBuf,
        /// Destination offset in graphics RAM
        #[arg(value_parser = parse_addr)]
        addr: u32,
    },
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

struct StdDelay;

impl DelayMs<u32> for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

fn eve_error<E: Debug>(err: evecmd::Error<E>) -> anyhow::Error {
    match err {
        evecmd::Error::Transport(inner) => anyhow!("SPIDriver error: {:?}", inner),
        other => anyhow!("{}", other),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let serial = Serial::new(
        &args.port,
        &PortSettings {
            baud_rate: serial_embedded_hal::BaudRate::BaudOther(460800),
            char_size: serial_embedded_hal::CharSize::Bits8,
            parity: serial_embedded_hal::Parity::ParityNone,
            stop_bits: serial_embedded_hal::StopBits::Stop1,
            flow_control: serial_embedded_hal::FlowControl::FlowNone,
        },
    )
    .with_context(|| format!("failed to open {}", args.port.display()))?;
    let (tx, rx) = serial.split();
    let mut sd = SPIDriver::new(tx, rx);
    sd.unselect()
        .map_err(|e| anyhow!("SPIDriver error: {:?}", e))?;
    let transport = EVESPIDriverTransport::new(sd, StdDelay);

    let mut eve: EVE<BT81x, _> = EVE::new(transport);
    let source = if args.internal_clock {
        ClockSource::Internal
    } else {
        ClockSource::External
    };
    eve.start_system_clock(source, ClockFrequency::DEFAULT_SYSCLK_FREQ)
        .map_err(eve_error)?;
    eve.poll_for_boot(&BootConfig::default())
        .map_err(eve_error)?;

    match args.command {
        Command::Probe => {
            let id = eve
                .borrow_low_level()
                .rd32(ROM_CHIPID)
                .map_err(|e| anyhow!("SPIDriver error: {:?}", e))?;
            let id = id.to_le_bytes();
            println!(
                "{} is up; chip ID data is [{:#04x}, {:#04x}, {:#04x}, {:#04x}]",
                BT81x::DEBUG_NAME,
                id[0],
                id[1],
                id[2],
                id[3]
            );
        }
        Command::Status => {
            let mut cp = eve.coprocessor(Config::default()).map_err(eve_error)?;
            let state = cp.is_busy().map_err(eve_error)?;
            let (read, write) = cp
                .with_transport(|t| {
                    let mut ll: LowLevel<BT81x, _> = LowLevel::new(t);
                    let read = register_value(&mut ll, Register::CMD_READ)?;
                    let write = register_value(&mut ll, Register::CMD_WRITE)?;
                    Ok((read, write))
                })
                .map_err(eve_error)?;
            let state = match state {
                FifoState::Idle => "idle",
                FifoState::Busy => "busy",
            };
            println!("coprocessor is {}; read offset {:#05x}, write offset {:#05x}", state, read, write);
        }
        Command::Upload { file, addr } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let len = u32::try_from(data.len()).context("file is too large")?;
            if u64::from(addr) + u64::from(len) > u64::from(MainMem::LENGTH) {
                return Err(anyhow!(
                    "{} bytes at {:#x} would run past the end of graphics RAM",
                    len,
                    addr
                ));
            }

            let mut cp: Coprocessor<BT81x, _> =
                eve.coprocessor(Config::default()).map_err(eve_error)?;
            let ptr = MainMem::ptr(addr);
            tracing::info!(len, addr, "uploading {}", file.display());
            cp.mem_write(ptr, &data).map_err(eve_error)?;
            let crc = cp.block_mem_crc(ptr, len).map_err(eve_error)?;
            println!("wrote {} bytes at {:#x}; CRC-32 reported by the chip is {:#010x}", len, addr, crc);
        }
    }
    Ok(())
}

fn register_value<T: evecmd::Transport>(
    ll: &mut LowLevel<BT81x, T>,
    reg: Register,
) -> Result<u16, evecmd::Error<T::Error>> {
    let addr = ll.reg(reg).ok_or(evecmd::Error::Unsupported)?;
    ll.rd16(addr).map_err(evecmd::Error::Transport)
}
