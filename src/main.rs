use clap::Parser;
use foxedit::{
    Block, ChatSource, Coords, FillConfig, FoxEdit, FoxEditConfig, Location, MemoryWorld, Result,
    SchedulerConfig, SelectionStore,
};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

#[derive(Parser)]
#[command(
    name = "foxedit",
    about = "Runs the fefill command against an in-memory world"
)]
pub struct Args {
    /// Milliseconds between scheduler ticks
    #[arg(long, env = "FOXEDIT_TICK_MS", default_value = "5000")]
    pub tick_ms: u64,

    /// Seconds a job may take before it's discarded
    #[arg(long, env = "FOXEDIT_TTL_SECS", default_value = "60")]
    pub ttl_secs: u64,

    /// Largest amount of cells a single edit may cover
    #[arg(long, env = "FOXEDIT_MAX_VOLUME", default_value = "1000000")]
    pub max_volume: usize,

    /// Size of the generated box as x,y,z
    #[arg(long, default_value = "25,25,25", value_parser = parse_coords)]
    pub extent: Coords,

    /// Block the generated box is filled with
    #[arg(short, long, default_value = "torch")]
    pub block: String,

    /// Where the player running the command stands, as x,y,z
    #[arg(long, default_value = "0,64,0", value_parser = parse_coords)]
    pub at: Coords,

    /// Positions to select before running, as x,y,z (repeatable)
    #[arg(short, long = "select", value_parser = parse_coords)]
    pub selections: Vec<Coords>,

    /// Arguments passed to fefill, leave empty to generate a box
    #[arg(default_value = "")]
    pub arguments: String,
}

fn parse_coords(value: &str) -> std::result::Result<Coords, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<std::result::Result<Vec<i32>, String>>()?;

    match parts.as_slice() {
        [x, y, z] => Ok(Coords::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got '{value}'")),
    }
}

const WORLD: &str = "world";
const PLAYER: &str = "gravityfox";

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = FoxEditConfig {
        scheduler: SchedulerConfig {
            tick_interval: Duration::from_millis(args.tick_ms),
            default_ttl: Duration::from_secs(args.ttl_secs),
            max_volume: args.max_volume,
        },
        fill: FillConfig {
            extent: args.extent,
            block: Block::try_new(&args.block)?,
        },
    };
    let wait_limit = config.scheduler.default_ttl + config.scheduler.tick_interval * 2;

    let world = MemoryWorld::new();
    world.load_world(WORLD);
    let selection = SelectionStore::new();
    for position in args.selections {
        selection.select(PLAYER, position);
    }

    let plugin = FoxEdit::start(config, world.clone(), selection)?;
    let player = Arc::new(ChatSource::player(PLAYER, Location::new(WORLD, args.at)));

    let instant = Instant::now();
    let result = plugin.process_command(&player, &format!("fefill {}", args.arguments));
    println!("fefill -> {result:?}");

    // the generating path answers when queued, when merging and with an "Edit #n .." report
    let resolved = |messages: Vec<String>| messages.iter().any(|m| m.starts_with("Edit "));
    if args.arguments.trim().is_empty() && result.is_some_and(|r| r.is_success()) {
        while !resolved(player.messages()) && instant.elapsed() < wait_limit {
            thread::sleep(Duration::from_millis(50));
        }
    }

    for message in player.messages() {
        println!("[{PLAYER}] {message}");
    }
    println!(
        "'{WORLD}' holds {} non-air block(s), took {:?}",
        world.block_count(WORLD)?,
        instant.elapsed()
    );

    let cancelled = plugin.shutdown();
    if !cancelled.is_empty() {
        println!("Cancelled {} job(s) on shutdown", cancelled.len());
    }

    Ok(())
}
