use clap::{Parser, Subcommand};
use client::host::{HostBot, HostOptions};
use client::network::QuizConnection;
use client::player::{AnswerStrategy, PlayerBot, PlayerOptions};
use log::info;
use shared::{JoinCode, ViolationKind};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Generate a quiz, open a session and watch it to the end
    Host {
        /// Quiz topic
        #[arg(short, long, default_value = "test")]
        topic: String,
        /// Number of questions to generate
        #[arg(short = 'n', long)]
        questions: Option<usize>,
        /// Total time shown to players, in minutes
        #[arg(short = 'm', long)]
        minutes: Option<u32>,
        /// Start once this many players have joined
        #[arg(short, long, default_value = "1")]
        players: usize,
    },
    /// Join a session and answer every question
    Player {
        /// Join code shown by the host
        code: String,
        /// Display name
        #[arg(short, long, default_value = "Player")]
        name: String,
        #[arg(long, value_enum, default_value = "first")]
        strategy: AnswerStrategy,
        /// Anti-cheat event to report, may be given more than once
        #[arg(long = "violation", value_parser = parse_violation)]
        violations: Vec<ViolationKind>,
        /// Milliseconds to wait before each answer
        #[arg(long, default_value = "0")]
        think_ms: u64,
        /// Seed for the random strategy, for repeatable runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_violation(s: &str) -> Result<ViolationKind, String> {
    Ok(ViolationKind::from(s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let conn = QuizConnection::connect(&args.server)
        .await?
        .with_fake_ping(args.fake_ping);

    match args.role {
        Role::Host {
            topic,
            questions,
            minutes,
            players,
        } => {
            let options = HostOptions {
                topic,
                question_count: questions,
                time_limit_minutes: minutes,
                expected_players: players,
                ..HostOptions::default()
            };
            let report = HostBot::new(conn, options)
                .run(|code| println!("Join code: {}", code))
                .await?;

            println!("Final scores for {}:", report.code);
            for player in &report.players {
                println!(
                    "  {:<16} {:>3}  violations: {}",
                    player.name, player.score, player.violation_count
                );
            }
        }
        Role::Player {
            code,
            name,
            strategy,
            violations,
            think_ms,
            seed,
        } => {
            let options = PlayerOptions {
                strategy,
                violations,
                think_time: Duration::from_millis(think_ms),
                ..PlayerOptions::new(name)
            };
            info!("Joining {} as {}", code, options.name);

            let bot = match seed {
                Some(seed) => PlayerBot::with_seed(conn, options, seed),
                None => PlayerBot::new(conn, options),
            };
            let report = bot.run(&JoinCode::new(code)).await?;
            println!(
                "Score: {}/{} ({} answered)",
                report.score,
                report.total_questions,
                report.answers.len()
            );
        }
    }

    Ok(())
}
