//! countdown - a terminal countdown timer with alarm sounds
//!
//! Pick a preset or type a duration, start it, and an alarm loops when it
//! reaches zero until you stop it.

use anyhow::Result;
use clap::{CommandFactory, Parser};

use countdown::cli::{
    play_preview, run_session, AppContext, Cli, Commands, Display, EngineParts, RunArgs,
    SoundCommand,
};
use countdown::settings::Preferences;
use countdown::sound::upload::install_custom_sound;
use countdown::types::{SoundId, Theme, PRESETS};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
            return Ok(());
        }
        Some(command) => command,
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let ctx = AppContext::load(cli.config_dir)?;
    let prefs = ctx.preferences();

    match command {
        Commands::Run(args) => run(&ctx, args).await?,
        Commands::Presets => Display::show_presets(PRESETS, None),
        Commands::Sound(cmd) => sound(&ctx, cmd).await?,
        Commands::Volume { percent } => {
            let mut selection = prefs.load_selection();
            selection.volume = f32::from(percent) / 100.0;
            prefs.save_selection(&selection);
            Display::show_success(&format!("Volume set to {}%", percent));
        }
        Commands::Mute => {
            save_muted(&prefs, true);
            Display::show_success("Sound muted");
        }
        Commands::Unmute => {
            save_muted(&prefs, false);
            Display::show_success("Sound unmuted");
        }
        Commands::Theme { theme } => {
            let theme = Theme::from(theme);
            prefs.set_theme(theme);
            Display::show_success(&format!("Theme set to {}", theme.as_str()));
        }
        Commands::Settings => {
            Display::show_settings(&prefs.load_selection(), prefs.theme(), &ctx.config_dir);
        }
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

fn save_muted(prefs: &Preferences, muted: bool) {
    let mut selection = prefs.load_selection();
    selection.muted = muted;
    prefs.save_selection(&selection);
}

/// Runs an interactive session, starting immediately if a duration was given.
async fn run(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let EngineParts {
        mut engine,
        wakeups,
        events,
    } = ctx.build_engine();

    let autostart = args.preset.is_some() || args.duration.is_some();
    if let Some(preset) = args.preset {
        engine.select_preset(preset);
    } else if let Some(duration) = args.duration {
        engine.set_input(duration);
    }
    if autostart {
        engine.start();
    } else {
        Display::show_session_help();
    }

    run_session(engine, wakeups, events, ctx.preferences().theme()).await
}

/// Handles the `sound` subcommands.
async fn sound(ctx: &AppContext, cmd: SoundCommand) -> Result<()> {
    let prefs = ctx.preferences();

    match cmd {
        SoundCommand::List => Display::show_sounds(&prefs.load_selection()),
        SoundCommand::Set { sound } => {
            let mut selection = prefs.load_selection();
            selection.sound = sound;
            prefs.save_selection(&selection);
            if sound == SoundId::Custom && selection.custom_audio.is_none() {
                Display::show_success("Alarm sound set to custom (no upload yet, chime plays)");
            } else {
                Display::show_success(&format!("Alarm sound set to {}", sound));
            }
        }
        SoundCommand::Preview { sound } => {
            let EngineParts {
                mut engine,
                mut wakeups,
                ..
            } = ctx.build_engine();
            let outcome = match sound {
                Some(sound) => engine.preview_sound(sound),
                None => engine.preview(),
            };
            play_preview(&mut engine, &mut wakeups, outcome).await;
        }
        SoundCommand::Upload { path } => {
            let installed = install_custom_sound(&path, &ctx.sounds_dir())?;
            let mut selection = prefs.load_selection();
            selection.custom_audio = Some(installed);
            selection.sound = SoundId::Custom;
            prefs.save_selection(&selection);
            Display::show_success("Custom sound uploaded and selected");
        }
        SoundCommand::ClearCustom => {
            let mut selection = prefs.load_selection();
            if let Some(path) = selection.custom_audio.take() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Could not remove {}: {}", path.display(), e);
                }
            }
            if selection.sound == SoundId::Custom {
                selection.sound = SoundId::default();
            }
            prefs.save_selection(&selection);
            Display::show_success("Custom sound cleared");
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
