//! Command definitions for the countdown CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{find_preset, DurationInput, Preset, SoundId, Theme};

// ============================================================================
// CLI Structure
// ============================================================================

/// Countdown timer with alarm sounds
#[derive(Parser, Debug)]
#[command(
    name = "countdown",
    version,
    about = "Terminal countdown timer with alarm sounds",
    long_about = "A countdown timer with presets, a progress display and a looping alarm.\n\
                  Alarm sound, volume and mute preferences are remembered between runs.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for settings, config.json and sounds
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an interactive countdown session
    Run(RunArgs),

    /// List the duration presets
    Presets,

    /// Manage the alarm sound
    #[command(subcommand)]
    Sound(SoundCommand),

    /// Set the alarm volume in percent (0-100)
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Mute all sounds
    Mute,

    /// Unmute sounds
    Unmute,

    /// Set the display theme
    Theme {
        #[arg(value_enum)]
        theme: ThemeArg,
    },

    /// Show the saved preferences
    Settings,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Alarm sound subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SoundCommand {
    /// List the available sounds
    List,

    /// Select the alarm sound
    Set {
        #[arg(value_parser = parse_sound)]
        sound: SoundId,
    },

    /// Play a sound once (the selected sound by default)
    Preview {
        #[arg(value_parser = parse_sound)]
        sound: Option<SoundId>,
    },

    /// Use an MP3 file (up to 5 MB) as the custom alarm sound
    Upload { path: PathBuf },

    /// Forget the uploaded custom sound
    ClearCustom,
}

/// Theme choice on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

// ============================================================================
// Run Command Arguments
// ============================================================================

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Duration as H:M:S, M:S, S or with units (e.g. 1h30m, 90s)
    #[arg(value_parser = parse_duration, conflicts_with = "preset")]
    pub duration: Option<DurationInput>,

    /// Start from a preset (1m, 3m, 5m, 10m, 15m, 25m, 30m, 45m, 1h)
    #[arg(short, long, value_parser = parse_preset)]
    pub preset: Option<Preset>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses a duration argument.
pub(crate) fn parse_duration(s: &str) -> Result<DurationInput, String> {
    s.parse::<DurationInput>()
}

/// Parses a preset id.
pub(crate) fn parse_preset(s: &str) -> Result<Preset, String> {
    find_preset(s).ok_or_else(|| format!("unknown preset '{}'", s))
}

fn parse_sound(s: &str) -> Result<SoundId, String> {
    s.parse::<SoundId>()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["countdown"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.config_dir.is_none());
        }

        #[test]
        fn test_parse_global_flags_after_subcommand() {
            let cli = Cli::parse_from(["countdown", "presets", "-v", "--config-dir", "/tmp/cd"]);
            assert!(cli.verbose);
            assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cd")));
            assert!(matches!(cli.command, Some(Commands::Presets)));
        }

        #[test]
        fn test_parse_volume_range() {
            let cli = Cli::parse_from(["countdown", "volume", "75"]);
            assert!(matches!(cli.command, Some(Commands::Volume { percent: 75 })));
            assert!(Cli::try_parse_from(["countdown", "volume", "101"]).is_err());
        }

        #[test]
        fn test_parse_theme() {
            let cli = Cli::parse_from(["countdown", "theme", "light"]);
            match cli.command {
                Some(Commands::Theme { theme }) => assert_eq!(Theme::from(theme), Theme::Light),
                _ => panic!("Expected Theme command"),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["countdown", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Run Command Tests
    // ------------------------------------------------------------------------

    mod run_args_tests {
        use super::*;

        #[test]
        fn test_parse_run_without_duration() {
            let cli = Cli::parse_from(["countdown", "run"]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert!(args.duration.is_none());
                    assert!(args.preset.is_none());
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_run_with_duration() {
            let cli = Cli::parse_from(["countdown", "run", "1:30"]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert_eq!(args.duration, Some(DurationInput::new(0, 1, 30)));
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_run_with_preset() {
            let cli = Cli::parse_from(["countdown", "run", "--preset", "25m"]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert_eq!(args.preset.map(|p| p.seconds), Some(1500));
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_invalid_duration_rejected() {
            assert!(Cli::try_parse_from(["countdown", "run", "soon"]).is_err());
            assert!(Cli::try_parse_from(["countdown", "run", "--preset", "2d"]).is_err());
        }

        #[test]
        fn test_duration_conflicts_with_preset() {
            assert!(Cli::try_parse_from(["countdown", "run", "90", "--preset", "5m"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Sound Command Tests
    // ------------------------------------------------------------------------

    mod sound_command_tests {
        use super::*;

        #[test]
        fn test_parse_sound_set() {
            let cli = Cli::parse_from(["countdown", "sound", "set", "bark"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Sound(SoundCommand::Set {
                    sound: SoundId::Bark
                }))
            ));
        }

        #[test]
        fn test_parse_sound_preview_default() {
            let cli = Cli::parse_from(["countdown", "sound", "preview"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Sound(SoundCommand::Preview { sound: None }))
            ));
        }

        #[test]
        fn test_parse_unknown_sound() {
            assert!(Cli::try_parse_from(["countdown", "sound", "set", "kazoo"]).is_err());
        }

        #[test]
        fn test_parse_clear_custom() {
            let cli = Cli::parse_from(["countdown", "sound", "clear-custom"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Sound(SoundCommand::ClearCustom))
            ));
        }
    }
}
