/// Command-line surface. Every subcommand maps to one operation in `app`.
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::store::Theme;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create an account and start a session
  Register {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Defaults to --password
    #[arg(long)]
    confirm: Option<String>,
  },
  Login {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
  },
  Logout,
  /// Show the signed-in user, refreshed from the server
  Whoami,
  #[command(subcommand)]
  Profile(ProfileCommand),
  /// Change the account password
  Password {
    #[arg(long)]
    current: String,
    #[arg(long)]
    new: String,
    #[arg(long)]
    confirm: Option<String>,
  },
  ForgotPassword {
    #[arg(long)]
    email: String,
  },
  ResetPassword {
    #[arg(long)]
    token: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm: Option<String>,
  },
  #[command(subcommand)]
  Cards(CardCommand),
  /// Word suggestions for partial input, typed one character at a time
  Suggest { text: String },
  /// Dictionary entry for a word
  Dictionary { word: String },
  #[command(subcommand)]
  Upload(UploadCommand),
  #[command(subcommand)]
  Notifications(NotificationCommand),
  #[command(subcommand)]
  Push(PushCommand),
  #[command(subcommand)]
  Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
  Show,
  Update {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
  List {
    #[arg(short, long)]
    search: Option<String>,
    #[arg(short, long)]
    favorites: bool,
    /// Skip the cache and read from the server
    #[arg(long)]
    refresh: bool,
  },
  Show { id: String },
  Add(CardDraftArgs),
  Edit {
    id: String,
    #[arg(long)]
    word: Option<String>,
    #[arg(long)]
    meaning: Option<String>,
    #[arg(long)]
    example: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    audio_url: Option<String>,
  },
  Delete { id: String },
  /// Flip the favorite flag
  Favorite { id: String },
}

#[derive(Args, Debug)]
pub struct CardDraftArgs {
  pub word: String,
  /// Filled from the dictionary when omitted with --autofill
  #[arg(long, default_value = "")]
  pub meaning: String,
  #[arg(long)]
  pub example: Option<String>,
  #[arg(long)]
  pub image: Option<PathBuf>,
  #[arg(long)]
  pub audio: Option<PathBuf>,
  #[arg(long)]
  pub favorite: bool,
  /// Look the word up and fill in blank fields
  #[arg(long)]
  pub autofill: bool,
}

#[derive(Subcommand, Debug)]
pub enum UploadCommand {
  Image { path: PathBuf },
  Audio { path: PathBuf },
  Files {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
  },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommand {
  Prefs,
  SetPrefs {
    #[arg(long)]
    enabled: Option<bool>,
    /// HH:mm
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    email: Option<bool>,
    #[arg(long)]
    push: Option<bool>,
  },
  History {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long, conflicts_with = "read")]
    unread: bool,
    /// Only notifications already read
    #[arg(long)]
    read: bool,
  },
}

#[derive(Subcommand, Debug)]
pub enum PushCommand {
  Register {
    token: String,
    #[arg(long, default_value = "cli")]
    platform: String,
  },
  Unregister,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
  Show,
  Set {
    #[arg(long)]
    theme: Option<Theme>,
    #[arg(long)]
    notifications: Option<bool>,
    /// HH:mm
    #[arg(long)]
    reminder: Option<String>,
    #[arg(long)]
    cards_per_session: Option<u32>,
  },
  Reset,
}
