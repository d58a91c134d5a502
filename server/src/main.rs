use clap::Parser;
use log::{info, warn};
use server::bot::Bot;
use server::config::GameConfig;
use server::game::Game;
use server::session::PlayerSession;
use std::time::Duration;

/// Runs a local match between practice bots.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Number of bots in the match
        #[clap(short, long, default_value = "4")]
        players: usize,
        /// Ticks per second at match start
        #[clap(short = 'r', long, default_value = "10")]
        base_tick_rate: u32,
        /// Seconds between tick rate increases
        #[clap(short = 'i', long, default_value = "10")]
        tick_increase_interval: u64,
        /// Empty margin kept around the surviving players
        #[clap(short, long, default_value = "1")]
        limit_gap: u32,
        /// Keep join order instead of shuffling ids
        #[clap(long)]
        no_shuffle: bool,
        /// Seed for the shuffle and the bots
        #[clap(short, long)]
        seed: Option<u64>,
    }

    env_logger::init();
    let args = Args::parse();
    if args.players == 0 {
        return Err("a match needs at least one player".into());
    }

    let config = GameConfig {
        base_tick_rate: args.base_tick_rate,
        tick_increase_interval: Duration::from_secs(args.tick_increase_interval),
        limit_gap: args.limit_gap,
        shuffle_players: !args.no_shuffle,
        seed: args.seed,
        ..GameConfig::default()
    };

    let mut sessions = Vec::with_capacity(args.players);
    let mut bots = Vec::with_capacity(args.players);
    for i in 0..args.players {
        let (session, link) = PlayerSession::new(format!("bot-{}", i));
        let bot = Bot::new(args.seed.unwrap_or_else(rand::random) ^ i as u64);
        sessions.push(session);
        bots.push(tokio::spawn(bot.play(link)));
    }

    let ended = Game::new(sessions, config).spawn();

    let end = tokio::select! {
        end = ended => end?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning match");
            return Ok(());
        }
    };

    for bot in bots {
        bot.await?;
    }

    info!("Game {} finished after {} ticks", end.game_id, end.ticks);
    for player in &end.players {
        let result = if end.winners.contains(&player.id) {
            "won"
        } else {
            "lost"
        };
        info!(
            "  {} (id {}) {}, rating {:.1}",
            player.name(),
            player.id,
            result,
            player.rating
        );
    }
    Ok(())
}
