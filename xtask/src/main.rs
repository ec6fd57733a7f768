use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    thread,
    time::Instant,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use ttp::{
    errno_result, ClockMode, SystemClock, ThreadUnit, Tracer, TtpConfig, DEFAULT_MAX_EVENTS,
    MAX_LINE_LEN,
};

mod dump;
mod logger;

/// Developer tasks for the ttp recorder.
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    /// Log ttp diagnostics at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a capture session with one emitting thread per simulated CPU and
    /// drain it through the device interface.
    Simulate {
        /// Number of simulated CPUs (one shard and one thread each).
        #[arg(long, default_value_t = 4)]
        cpus: usize,
        /// Events emitted by every CPU.
        #[arg(long, default_value_t = 1_000)]
        events: u32,
        /// Per-shard capacity.
        #[arg(long, default_value_t = DEFAULT_MAX_EVENTS)]
        capacity: usize,
        /// Time base for the session.
        #[arg(long, value_enum, default_value_t = Clock::Mono)]
        clock: Clock,
        /// Write drained lines here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge a drained dump into one timeline ordered by timestamp.
    Sort {
        /// Dump file produced by draining the device.
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Clock {
    Wall,
    Mono,
}

impl From<Clock> for ClockMode {
    fn from(clock: Clock) -> Self {
        match clock {
            Clock::Wall => ClockMode::WallClock,
            Clock::Mono => ClockMode::Monotonic,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    match cli.cmd {
        Cmd::Simulate {
            cpus,
            events,
            capacity,
            clock,
            out,
        } => simulate(cpus, events, capacity, clock.into(), out),
        Cmd::Sort { input } => sort(input),
    }
}

/// Emit `events` trace points from each of `cpus` threads, then drain.
fn simulate(
    cpus: usize,
    events: u32,
    capacity: usize,
    clock: ClockMode,
    out: Option<PathBuf>,
) -> Result<()> {
    if cpus == 0 {
        bail!("--cpus must be at least 1");
    }

    let config = TtpConfig::new(cpus).with_max_events(capacity);
    let tracer =
        Tracer::new(config, SystemClock::new(), ThreadUnit).context("ttp init failed")?;

    let mut control = tracer.open();
    write_command(&mut control, clock_token(clock))?;
    write_command(&mut control, "start")?;

    let started = Instant::now();
    // Worker threads are the first to touch ThreadUnit, so they take
    // units 0..cpus
    thread::scope(|scope| {
        for cpu in 0..cpus as u32 {
            let tracer = &tracer;
            scope.spawn(move || {
                for i in 0..events {
                    tracer.emit(cpu.wrapping_mul(events).wrapping_add(i));
                }
            });
        }
    });
    let elapsed = started.elapsed();

    write_command(&mut control, "stop")?;
    drop(control);

    let mut sink: Box<dyn Write> = match &out {
        Some(path) => Box::new(io::BufWriter::new(
            fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::BufWriter::new(io::stdout().lock())),
    };

    let mut file = tracer.open();
    let mut buf = [0u8; MAX_LINE_LEN];
    let mut lines = 0u64;
    loop {
        let n = errno_result(file.read(&mut buf));
        if n < 0 {
            bail!("drain failed with errno {}", -n);
        }
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n as usize])?;
        lines += 1;
    }
    sink.flush()?;

    let status = tracer.status();
    eprint!("{}", status);
    eprintln!(
        "emitted {} events on {} CPUs in {:?}, drained {} lines, dropped {}",
        u64::from(events) * cpus as u64,
        cpus,
        elapsed,
        lines,
        status.total_dropped()
    );
    Ok(())
}

fn clock_token(clock: ClockMode) -> &'static str {
    ttp::Command::SelectClock(clock).token()
}

fn write_command<C, U>(file: &mut ttp::TtpFile<'_, C, U>, command: &str) -> Result<()> {
    file.write(command.as_bytes())
        .with_context(|| format!("command {:?} rejected", command))?;
    Ok(())
}

/// Print a dump ordered by timestamp.
fn sort(input: PathBuf) -> Result<()> {
    let mut records = dump::parse_file(&input)?;
    dump::sort_by_time(&mut records);

    let mut stdout = io::BufWriter::new(io::stdout().lock());
    for record in &records {
        writeln!(stdout, "{}", record)?;
    }
    stdout.flush()?;
    Ok(())
}
