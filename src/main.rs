//! Soulmatch CLI
//!
//! Usage:
//!   soulmatch --serve                        # HTTP API server with background ticker
//!   soulmatch --serve --config engine.json   # Timing from a JSON file
//!   soulmatch --simulate                     # Scripted two-player run
//!   soulmatch --simulate --json              # Same, as JSON lines

use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use soulmatch::core::{run_server, Clock, Engine, ManualClock};
use soulmatch::types::{ClientState, EngineConfig, EngineEvent, EntryId};
use soulmatch::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "soulmatch",
    version = VERSION,
    about = "Soulmatch - realtime reciprocal press-and-hold matchmaking",
    long_about = "Soulmatch runs the matchmaking engine behind a press-and-hold match screen.\n\n\
                  Participants join a presence queue and are shown one focus target at a\n\
                  time. Holding on a target for the minimum hold while that target holds\n\
                  back forms a match, which opens a timed conversation session.\n\n\
                  Modes:\n  \
                  --serve     HTTP + WebSocket API server\n  \
                  --simulate  Scripted two-player run on a manual clock"
)]
struct Args {
    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Run the scripted two-player simulation
    #[arg(long)]
    simulate: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// JSON file with engine timing (camelCase keys, missing keys keep defaults)
    #[arg(short, long)]
    config: Option<String>,

    /// Override minimum hold (ms)
    #[arg(long)]
    min_hold_ms: Option<u64>,

    /// Override focus window duration (ms)
    #[arg(long)]
    focus_window_ms: Option<u64>,

    /// Override expected heartbeat cadence (ms)
    #[arg(long)]
    heartbeat_interval_ms: Option<u64>,

    /// Override heartbeat staleness threshold (ms)
    #[arg(long)]
    stale_after_ms: Option<u64>,

    /// Override conversation session length (ms)
    #[arg(long)]
    conversation_ms: Option<u64>,

    /// Override intro phase before auto-activation (ms, 0 skips it)
    #[arg(long)]
    success_intro_ms: Option<u64>,

    /// Override maximum pending press duration (ms)
    #[arg(long)]
    max_press_duration_ms: Option<u64>,

    /// Override maintenance tick interval (ms)
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Override retention of finished records (ms)
    #[arg(long)]
    retention_ms: Option<u64>,

    /// Seed for target selection in simulation
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig, soulmatch::types::ConfigError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(v) = self.min_hold_ms {
            config.min_hold_ms = v;
        }
        if let Some(v) = self.focus_window_ms {
            config.focus_window_duration_ms = v;
        }
        if let Some(v) = self.heartbeat_interval_ms {
            config.heartbeat_interval_ms = v;
        }
        if let Some(v) = self.stale_after_ms {
            config.stale_after_ms = v;
        }
        if let Some(v) = self.conversation_ms {
            config.conversation_session_ms = v;
        }
        if let Some(v) = self.success_intro_ms {
            config.success_intro_ms = v;
        }
        if let Some(v) = self.max_press_duration_ms {
            config.max_press_duration_ms = v;
        }
        if let Some(v) = self.tick_interval_ms {
            config.tick_interval_ms = v;
        }
        if let Some(v) = self.retention_ms {
            config.retention_ms = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "soulmatch=info".into()),
        )
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match args.engine_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    if args.serve {
        run_serve(&args, config).await;
    } else if args.simulate {
        run_simulation(&args, config);
    } else {
        eprintln!("Nothing to do: pass --serve or --simulate (see --help)");
        std::process::exit(2);
    }
}

/// Run HTTP API server
async fn run_serve(args: &Args, config: EngineConfig) {
    print_header("API Server");
    println!("  POST /queue/join              - Join queue");
    println!("  POST /queue/:id/heartbeat     - Heartbeat");
    println!("  POST /queue/:id/leave         - Leave queue");
    println!("  POST /press/start|commit|cancel - Press/hold");
    println!("  POST /match/:id/ack|close     - Match lifecycle");
    println!("  GET  /state/:id               - Client state");
    println!("  WS   /ws/:id                  - Live client state");
    println!("  GET  /health                  - Health check");
    println!();

    if let Err(e) = run_server(&args.addr, config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Two participants focus on each other, hold, match and open a session
fn run_simulation(args: &Args, config: EngineConfig) {
    let clock = Arc::new(ManualClock::new(0));
    let engine = Engine::with_seed(config.clone(), clock.clone(), args.seed);
    let events = engine.subscribe();
    let mut printer = Printer { json: args.json, events };

    if !args.json {
        print_header("Simulation");
    }

    let (alice, bob) = match (
        engine.join_queue("sim:alice", Some("Alice"), None),
        engine.join_queue("sim:bob", Some("Bob"), None),
    ) {
        (Ok(a), Ok(b)) => (a.entry_id, b.entry_id),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Join failed: {}", e);
            std::process::exit(1);
        }
    };
    printer.state("alice joined", &engine.client_state(alice));

    let (Some(window_a), Some(window_b)) = (
        engine.client_state(alice).focus_window.map(|w| w.id),
        engine.client_state(bob).focus_window.map(|w| w.id),
    ) else {
        eprintln!("No focus windows were assigned");
        std::process::exit(1);
    };

    let hold_start = 100;
    clock.set(hold_start);
    let press_a = engine.press_start(alice, bob, window_a);
    clock.set(hold_start + 100);
    let press_b = engine.press_start(bob, alice, window_b);
    let (press_a, press_b) = match (press_a, press_b) {
        (Ok(a), Ok(b)) => (a.press_event_id, b.press_event_id),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Press start failed: {}", e);
            std::process::exit(1);
        }
    };
    let (Some(press_a), Some(press_b)) = (press_a, press_b) else {
        eprintln!("Press start returned no press id");
        std::process::exit(1);
    };
    printer.state("both holding", &engine.client_state(alice));

    clock.set(hold_start + config.min_hold_ms.saturating_sub(100));
    printer.result("alice commits early", &engine.press_commit(alice, press_a, bob, window_a));
    clock.set(hold_start + config.min_hold_ms + 50);
    printer.result("alice commits", &engine.press_commit(alice, press_a, bob, window_a));
    clock.set(hold_start + config.min_hold_ms + 100);
    printer.result("bob commits", &engine.press_commit(bob, press_b, alice, window_b));

    let Some(match_id) = engine.client_state(alice).active_match.map(|m| m.match_id) else {
        printer.note("no match formed");
        return;
    };
    printer.result("alice acknowledges", &engine.acknowledge_match(alice, match_id));
    printer.result("bob acknowledges", &engine.acknowledge_match(bob, match_id));
    printer.state("session open", &engine.client_state(bob));

    // Keep both alive through the conversation
    let ends_at = clock.now_ms() + config.conversation_session_ms;
    while clock.now_ms() < ends_at {
        clock.advance(config.heartbeat_interval_ms.min(ends_at - clock.now_ms()));
        for entry in [alice, bob] {
            if let Err(e) = engine.heartbeat(entry) {
                printer.note(&format!("heartbeat failed: {}", e));
            }
        }
    }
    engine.tick();
    printer.state("conversation over", &engine.client_state(alice));

    for entry in [alice, bob] {
        engine.leave_queue(entry);
    }
    printer.drain();
}

struct Printer {
    json: bool,
    events: tokio::sync::broadcast::Receiver<EngineEvent>,
}

impl Printer {
    fn state(&mut self, label: &str, state: &ClientState) {
        self.drain();
        if self.json {
            self.line(label, state);
            return;
        }
        let snapshot = &state.queue_snapshot;
        println!(
            "{} {} t={} status={} queue={}",
            "▸".cyan(),
            label.bold(),
            state.server_now,
            snapshot.status.to_string().yellow(),
            snapshot.queue_count
        );
        if let (Some(window), Some(target)) = (&state.focus_window, &state.focus_target) {
            println!(
                "    focus {} until t={}",
                short(target.entry_id),
                window.ends_at
            );
        }
        if let Some(hold) = &state.self_hold {
            println!("    holding {:.0}%", hold.progress_ratio * 100.0);
        }
        if let Some(hold) = &state.partner_hold {
            println!("    partner holding {:.0}%", hold.progress_ratio * 100.0);
        }
        if let Some(m) = &state.active_match {
            println!("    {} {} with {}", "match".green(), m.status, short(m.matched_user.entry_id));
        }
    }

    fn result<T: serde::Serialize, E: std::fmt::Display>(&mut self, label: &str, result: &Result<T, E>) {
        self.drain();
        match result {
            Ok(value) if self.json => self.line(label, value),
            Ok(value) => println!(
                "{} {} {}",
                "▸".cyan(),
                label.bold(),
                serde_json::to_string(value).unwrap_or_default().dimmed()
            ),
            Err(e) if self.json => self.line(label, &serde_json::json!({ "error": e.to_string() })),
            Err(e) => println!("{} {} {}", "✗".red(), label.bold(), e),
        }
    }

    fn note(&mut self, text: &str) {
        if self.json {
            self.line("note", &text);
        } else {
            println!("{} {}", "!".yellow(), text);
        }
    }

    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if self.json {
                self.line("event", &event);
            } else {
                let text = serde_json::to_string(&event).unwrap_or_default();
                println!("  {} {}", "event".magenta(), text.dimmed());
            }
        }
    }

    fn line<T: serde::Serialize + ?Sized>(&self, label: &str, value: &T) {
        let line = serde_json::json!({ "step": label, "data": value });
        println!("{}", line);
    }
}

fn short(id: EntryId) -> String {
    id.to_string().chars().take(8).collect()
}

fn print_header(mode: &str) {
    println!("{}", "========================================".bold());
    println!("  {} v{} - {}", "Soulmatch".bold(), VERSION, mode);
    println!("{}", "========================================".bold());
    println!();
}
