//! Reads a MAX31855 on one of the Raspberry Pi's SPI ports and prints the temperatures

use std::{
    process,
    thread::sleep,
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use max31855::*;
use rppal::spi::{Bus, SlaveSelect, Spi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SpiBus {
    Spi0,
    Spi1,
    Spi2,
    Spi3,
    Spi4,
    Spi5,
    Spi6,
}

impl From<SpiBus> for Bus {
    fn from(bus: SpiBus) -> Self {
        match bus {
            SpiBus::Spi0 => Bus::Spi0,
            SpiBus::Spi1 => Bus::Spi1,
            SpiBus::Spi2 => Bus::Spi2,
            SpiBus::Spi3 => Bus::Spi3,
            SpiBus::Spi4 => Bus::Spi4,
            SpiBus::Spi5 => Bus::Spi5,
            SpiBus::Spi6 => Bus::Spi6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChipSelect {
    Ss0,
    Ss1,
    Ss2,
}

impl From<ChipSelect> for SlaveSelect {
    fn from(cs: ChipSelect) -> Self {
        match cs {
            ChipSelect::Ss0 => SlaveSelect::Ss0,
            ChipSelect::Ss1 => SlaveSelect::Ss1,
            ChipSelect::Ss2 => SlaveSelect::Ss2,
        }
    }
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// SPI bus the MAX31855 is on
    #[arg(short, long, value_enum, default_value_t = SpiBus::Spi0)]
    bus: SpiBus,
    /// Chip select line of the MAX31855
    #[arg(short, long, value_enum, default_value_t = ChipSelect::Ss0)]
    slave_select: ChipSelect,
    /// Number of readings to take, 0 reads forever
    #[arg(short, long, value_name = "count", default_value_t = 1)]
    count: u64,
    /// Time between readings in ms
    #[arg(short, long, value_name = "interval_ms", default_value_t = 500)]
    interval_ms: u64,
    /// Also print the raw frame
    #[arg(short, long)]
    raw: bool,
}

/// Sleeps until `instant`, returning immediately if it already passed.
#[inline]
fn sleep_till(instant: Instant) {
    let sleep_dur = instant.saturating_duration_since(Instant::now());

    sleep(sleep_dur)
}

/// Takes one reading and prints it. Only transport errors are returned, faults
/// are printed and the run continues.
fn poll(thermocouple: &mut Max31855<Spi>, raw: bool) -> Result<(), RpiSpiError> {
    let frame = thermocouple.read_frame()?;

    if raw {
        println!(
            "frame: {:02x} {:02x} {:02x} {:02x}",
            frame[0], frame[1], frame[2], frame[3]
        );
    }

    match decode(frame) {
        Ok(reading) => println!(
            "thermocouple: {:.2} C, internal: {:.4} C",
            reading.thermocouple, reading.internal
        ),
        Err(fault) => warn!("{}", fault),
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let port = RpiSpiPort::new(cli.bus.into(), cli.slave_select.into());

    let mut thermocouple = match Max31855::open(port) {
        Ok(thermocouple) => thermocouple,
        Err(e) => {
            error!("could not open {:?} {:?}: {}", cli.bus, cli.slave_select, e);
            process::exit(1);
        }
    };

    info!("reading MAX31855 on {:?} {:?}", cli.bus, cli.slave_select);

    let interval = Duration::from_millis(cli.interval_ms);
    let mut next = Instant::now();
    let mut taken: u64 = 0;

    loop {
        sleep_till(next);
        next += interval;

        if let Err(e) = poll(&mut thermocouple, cli.raw) {
            error!("{}", e);
            process::exit(1);
        }

        taken += 1;

        if cli.count != 0 && taken >= cli.count {
            break;
        }
    }
}
