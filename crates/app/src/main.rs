mod player;
mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glassbeats_backends::MetadataResolver;
use glassbeats_core::{refs, AppConfig, Phase, RepeatMode, StateStore, Track};
use glassbeats_metadata::{build_resolver_chain, resolve_all};
use session::Session;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "glassbeats",
    about = "Playlist queue engine with a headless player and oEmbed metadata"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the saved queue until it ends or ctrl-c.
    Run,
    Status,
    List,
    Add {
        reference: String,
        #[arg(long)]
        play: bool,
    },
    Remove {
        position: usize,
    },
    Move {
        from: usize,
        to: usize,
    },
    Play {
        position: usize,
    },
    Next,
    Prev,
    Shuffle {
        #[arg(value_enum, default_value_t = Switch::Toggle)]
        mode: Switch,
    },
    /// Set the repeat mode, or cycle off -> all -> one without an argument.
    Repeat {
        mode: Option<RepeatMode>,
    },
    /// Show the volume, or set it in percent.
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: Option<u8>,
    },
    /// Add a track to the up-next list, played before the queue advances.
    Enqueue {
        reference: String,
    },
    UpNext {
        #[command(subcommand)]
        action: Option<UpNextAction>,
    },
    Save {
        name: String,
    },
    Load {
        name: String,
    },
    Playlists,
    DeletePlaylist {
        name: String,
    },
    /// Look up titles for every track still showing its id.
    Resolve,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum UpNextAction {
    Play { position: usize },
    Remove { position: usize },
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Status);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Config {
        action: ConfigAction::Init,
    } = cmd
    {
        init_config(&cfg_path)?;
        println!("Initialized config at {}", cfg_path.display());
        return Ok(());
    }

    let cfg = load_or_default(&cfg_path)?;
    init_logging(&cfg.log_level);
    let store = StateStore::new(state_dir(&cfg));

    match cmd {
        Commands::Run => player::run(&cfg, &store).await,
        Commands::Resolve => resolve(&cfg, &store).await,
        Commands::Playlists => list_playlists(&store),
        Commands::DeletePlaylist { name } => {
            if !store.delete_playlist(&name)? {
                bail!("no saved playlist named `{name}`");
            }
            println!("Deleted playlist `{name}`");
            Ok(())
        }
        other => {
            let mut session = Session::open(&cfg, &store)?;
            edit(&mut session, &store, other)?;
            let chain = build_resolver_chain(&cfg.metadata);
            resolve_queued(&chain, &mut session).await;
            session.save()
        }
    }
}

fn edit(session: &mut Session, store: &StateStore, cmd: Commands) -> Result<()> {
    let engine = &mut session.engine;
    match cmd {
        Commands::Status => print_status(session),
        Commands::List => print_list(session),
        Commands::Add { reference, play } => {
            let id = parse_reference(&reference)?;
            let index = engine.add_track(Track::new(id.clone()));
            println!("Added {id} at position {}", index + 1);
            if play {
                engine.play_at(index)?;
                print_now_playing(session);
            }
        }
        Commands::Remove { position } => {
            let track = engine.remove_at(to_index(position)?)?;
            println!("Removed {}", track.display_title());
        }
        Commands::Move { from, to } => {
            engine.move_track(to_index(from)?, to_index(to)?)?;
            print_list(session);
        }
        Commands::Play { position } => {
            engine.play_at(to_index(position)?)?;
            print_now_playing(session);
        }
        Commands::Next => {
            engine.play_next();
            print_now_playing(session);
        }
        Commands::Prev => {
            engine.play_previous();
            print_now_playing(session);
        }
        Commands::Shuffle { mode } => {
            let enabled = match mode {
                Switch::On => true,
                Switch::Off => false,
                Switch::Toggle => !engine.state().shuffle_enabled,
            };
            engine.set_shuffle(enabled);
            println!("Shuffle {}", if enabled { "on" } else { "off" });
        }
        Commands::Repeat { mode } => {
            let mode = match mode {
                Some(mode) => {
                    engine.set_repeat_mode(mode);
                    mode
                }
                None => engine.cycle_repeat_mode(),
            };
            println!("Repeat {}", mode.as_str());
        }
        Commands::Volume { percent } => {
            if let Some(percent) = percent {
                engine.set_volume(percent);
            }
            println!("Volume {}%", engine.volume());
        }
        Commands::Enqueue { reference } => {
            let id = parse_reference(&reference)?;
            engine.enqueue(id.clone());
            println!("Queued {id} ({} up next)", engine.up_next().count());
        }
        Commands::UpNext { action } => match action {
            None => print_up_next(session),
            Some(UpNextAction::Play { position }) => {
                engine.play_up_next(to_index(position)?)?;
                print_now_playing(session);
            }
            Some(UpNextAction::Remove { position }) => {
                let id = engine.remove_up_next(to_index(position)?)?;
                println!("Removed {id} from up next");
            }
            Some(UpNextAction::Clear) => {
                engine.clear_up_next();
                println!("Up next cleared");
            }
        },
        Commands::Save { name } => {
            let tracks: Vec<Track> = engine.tracks().cloned().collect();
            let count = tracks.len();
            store.save_playlist(&name, tracks)?;
            println!("Saved {count} tracks as `{name}`");
        }
        Commands::Load { name } => {
            let Some(saved) = store.playlist(&name)? else {
                bail!("no saved playlist named `{name}`");
            };
            engine.replace_tracks(saved.tracks);
            println!("Loaded `{name}` ({} tracks)", engine.len());
        }
        Commands::Run
        | Commands::Resolve
        | Commands::Playlists
        | Commands::DeletePlaylist { .. }
        | Commands::Config { .. } => unreachable!("handled before opening a session"),
    }
    Ok(())
}

async fn resolve(cfg: &AppConfig, store: &StateStore) -> Result<()> {
    let chain = build_resolver_chain(&cfg.metadata);
    if chain.is_empty() {
        bail!("metadata lookups are disabled in the configuration");
    }

    let mut session = Session::open(cfg, store)?;
    let requested = session.engine.request_missing_metadata();
    let resolved = resolve_queued(&chain, &mut session).await;
    session.save()?;
    println!("Resolved {resolved} of {requested} tracks");
    Ok(())
}

/// Runs the lookups the engine queued (for example by `play`) and applies
/// the results. Returns how many titles landed.
async fn resolve_queued(resolver: &dyn MetadataResolver, session: &mut Session) -> usize {
    let requests = session.engine.take_metadata_requests();
    if requests.is_empty() {
        return 0;
    }
    let mut resolved = 0;
    for outcome in resolve_all(resolver, requests).await {
        if session.apply_outcome(outcome) {
            resolved += 1;
        }
    }
    resolved
}

fn list_playlists(store: &StateStore) -> Result<()> {
    let all = store.load_playlists()?;
    if all.is_empty() {
        println!("No saved playlists");
    }
    for (name, saved) in all {
        println!("{name}: {} tracks", saved.tracks.len());
    }
    Ok(())
}

fn print_status(session: &Session) {
    let engine = &session.engine;
    let state = engine.state();
    let phase = match state.phase() {
        Phase::Idle => "idle",
        Phase::Playing => "playing",
        Phase::Paused => "paused",
        Phase::Stopped => "stopped",
    };
    println!("state: {phase}");
    match engine.current_track() {
        Some(track) => println!("track: {}", describe(track)),
        None => println!("track: <none>"),
    }
    println!("queue: {} tracks", engine.len());
    println!("up next: {}", engine.up_next().count());
    println!("shuffle: {}", if state.shuffle_enabled { "on" } else { "off" });
    println!("repeat: {}", state.repeat_mode.as_str());
    println!("volume: {}%", engine.volume());
}

fn print_list(session: &Session) {
    let engine = &session.engine;
    if engine.is_empty() {
        println!("Queue is empty");
        return;
    }
    let current = engine.state().current_index;
    for (i, track) in engine.tracks().enumerate() {
        let marker = if current == Some(i) { '>' } else { ' ' };
        println!("{marker} {:>3}. {}", i + 1, describe(track));
    }
}

fn print_up_next(session: &Session) {
    let mut any = false;
    for (i, id) in session.engine.up_next().enumerate() {
        println!("{:>3}. {id}", i + 1);
        any = true;
    }
    if !any {
        println!("Up next is empty");
    }
}

fn print_now_playing(session: &Session) {
    let engine = &session.engine;
    match (engine.state().current_index, engine.current_track()) {
        (Some(i), Some(track)) if engine.state().is_playing => {
            println!("Now playing {}/{}: {}", i + 1, engine.len(), describe(track))
        }
        (Some(i), Some(track)) => {
            println!("Stopped at {}/{}: {}", i + 1, engine.len(), describe(track))
        }
        _ => println!("Nothing playing"),
    }
}

pub(crate) fn describe(track: &Track) -> String {
    let mut out = track.display_title().to_string();
    if let Some(artist) = &track.artist {
        out.push_str(&format!(" - {artist}"));
    }
    if let Some(secs) = track.duration_secs {
        out.push_str(&format!(" ({})", refs::format_time(secs as f64)));
    }
    out
}

fn parse_reference(reference: &str) -> Result<String> {
    match refs::extract_video_id(reference) {
        Some(id) => Ok(id),
        None => bail!("couldn't parse a video id or URL from `{reference}`"),
    }
}

/// Command-line positions are 1-based, matching `list` output.
fn to_index(position: usize) -> Result<usize> {
    match position.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("positions start at 1"),
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("glassbeats").join("config.toml")
}

fn state_dir(cfg: &AppConfig) -> PathBuf {
    cfg.state_dir.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glassbeats")
    })
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
    debug!(level = log_level, "logging initialised");
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("GLASSBEATS_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Ok(v) = std::env::var("GLASSBEATS_STATE_DIR") {
        if !v.trim().is_empty() {
            cfg.state_dir = Some(PathBuf::from(v));
        }
    }
    if let Ok(v) = std::env::var("GLASSBEATS_AUTO_PLAY") {
        if let Ok(parsed) = v.parse::<bool>() {
            cfg.playback.auto_play_first_add = parsed;
        }
    }
    if let Ok(v) = std::env::var("GLASSBEATS_METADATA") {
        if let Ok(parsed) = v.parse::<bool>() {
            cfg.metadata.enabled = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{describe, edit, load_or_default, parse_reference, resolve_queued, to_index, Cli, Commands};
    use crate::session::Session;
    use async_trait::async_trait;
    use clap::Parser;
    use glassbeats_backends::{MetadataError, MetadataResolver};
    use glassbeats_core::{AppConfig, StateStore, Track, TrackMetadata};

    struct FixedTitles;

    #[async_trait]
    impl MetadataResolver for FixedTitles {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn resolve(&self, track_id: &str) -> Result<TrackMetadata, MetadataError> {
            Ok(TrackMetadata {
                title: Some(format!("Song {track_id}")),
                ..TrackMetadata::default()
            })
        }
    }

    #[test]
    fn positions_are_one_based() {
        assert_eq!(to_index(1).unwrap(), 0);
        assert!(to_index(0).is_err());
    }

    #[test]
    fn references_go_through_id_extraction() {
        assert_eq!(
            parse_reference("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert!(parse_reference("hello world").is_err());
    }

    #[test]
    fn describe_includes_known_fields() {
        let mut track = Track::new("dQw4w9WgXcQ");
        assert_eq!(describe(&track), "dQw4w9WgXcQ");
        track.title = Some("Song".to_string());
        track.artist = Some("Band".to_string());
        track.duration_secs = Some(125);
        assert_eq!(describe(&track), "Song - Band (2:05)");
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n[playback]\nauto_play_first_add = true\nrestart_threshold_ms = 5000\n",
        )
        .unwrap();

        let cfg = load_or_default(&path).unwrap();
        assert!(cfg.playback.auto_play_first_add);
        assert_eq!(cfg.playback.restart_threshold_ms, 5_000);
        assert_eq!(cfg.playback.default_track_secs, 210);
        assert!(cfg.metadata.enabled);
        assert_eq!(cfg.schema_version, 1);
    }

    #[test]
    fn cli_parses_repeat_and_up_next() {
        Cli::try_parse_from(["glassbeats", "repeat", "one"]).unwrap();
        Cli::try_parse_from(["glassbeats", "up-next", "remove", "2"]).unwrap();
        Cli::try_parse_from(["glassbeats", "shuffle", "on", "--config", "x.toml"]).unwrap();
        assert!(Cli::try_parse_from(["glassbeats", "repeat", "twice"]).is_err());
        Cli::try_parse_from(["glassbeats", "volume", "40"]).unwrap();
        assert!(Cli::try_parse_from(["glassbeats", "volume", "101"]).is_err());
    }

    #[tokio::test]
    async fn one_shot_play_fetches_the_title_it_queued() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut session = Session::open(&AppConfig::default(), &store).unwrap();
        session.engine.add_track(Track::new("dQw4w9WgXcQ"));

        edit(&mut session, &store, Commands::Play { position: 1 }).unwrap();

        assert_eq!(resolve_queued(&FixedTitles, &mut session).await, 1);
        assert_eq!(
            session.engine.track(0).unwrap().display_title(),
            "Song dQw4w9WgXcQ"
        );
        assert!(session.engine.take_metadata_requests().is_empty());
    }

    #[test]
    fn volume_command_persists_through_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let cfg = AppConfig::default();
        let mut session = Session::open(&cfg, &store).unwrap();

        edit(&mut session, &store, Commands::Volume { percent: Some(35) }).unwrap();
        session.save().unwrap();

        let reopened = Session::open(&cfg, &store).unwrap();
        assert_eq!(reopened.engine.volume(), 35);
    }
}
