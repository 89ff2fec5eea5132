use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::api::types::{
  CardFilter, Flashcard, FlashcardDraft, FlashcardPatch, NotificationHistoryParams,
  NotificationPreferences, User,
};
use crate::api::{AuthApi, FlashcardApi, HttpGateway, NotificationApi, ProfileUpdate, UploadApi};
use crate::cache::{KeyValueStorage, MemoryStorage, SqliteStorage};
use crate::commands::{
  CardCommand, CardDraftArgs, Command, NotificationCommand, ProfileCommand, PushCommand,
  SettingsCommand, UploadCommand,
};
use crate::config::Config;
use crate::error::ApiError;
use crate::event::{EventBus, SessionEvent};
use crate::queries::{FlashcardQueries, NotificationQueries};
use crate::query::{QueryCache, QueryObserver, QueryOptions};
use crate::store::{CardStore, PushTokenStore, SessionStore, SessionToken, SettingsStore};
use crate::suggest::WordSuggester;

/// Every service the client needs, wired once per process.
pub struct App {
  session: SessionStore,
  events: broadcast::Receiver<SessionEvent>,
  cache: QueryCache,
  cards: CardStore,
  settings: SettingsStore,
  auth: AuthApi,
  uploads: UploadApi,
  flashcards: FlashcardQueries,
  notifications: NotificationQueries,
  preferences: QueryObserver<NotificationPreferences>,
  suggester: WordSuggester,
}

impl App {
  /// `ephemeral` keeps all persisted state in memory for this run only.
  pub fn new(config: &Config, ephemeral: bool) -> Result<Self> {
    let storage: Arc<dyn KeyValueStorage> = if ephemeral {
      Arc::new(MemoryStorage::new())
    } else {
      let path = config.storage_path()?;
      debug!(path = %path.display(), "opening storage");
      Arc::new(SqliteStorage::open(&path)?)
    };

    let bus = EventBus::new();
    let events = bus.subscribe();
    let session = SessionStore::restore(Arc::clone(&storage), bus);
    let gateway = HttpGateway::new(&config.api, session.clone())?;

    let cache = QueryCache::new();
    let cards = CardStore::restore(Arc::clone(&storage), session.clone());
    let settings = SettingsStore::restore(Arc::clone(&storage));
    let push = PushTokenStore::new(storage);

    let options = QueryOptions::default()
      .with_stale_time(Duration::from_secs(config.cache.stale_secs))
      .with_gc_time(Duration::from_secs(config.cache.gc_secs));

    let uploads = UploadApi::new(gateway.clone());
    let flashcards = FlashcardQueries::new(
      cache.clone(),
      FlashcardApi::new(gateway.clone()),
      uploads.clone(),
      cards.clone(),
      options,
    );
    let notifications = NotificationQueries::new(
      cache.clone(),
      NotificationApi::new(gateway.clone()),
      session.clone(),
      push,
      options,
      Duration::from_secs(config.cache.history_stale_secs),
    );
    let mut preferences = notifications.preferences_observer();
    preferences.set_enabled(false);
    let suggester = WordSuggester::new(
      FlashcardApi::new(gateway.clone()),
      Duration::from_millis(config.suggestions.debounce_ms),
      config.suggestions.limit,
    );

    Ok(Self {
      session,
      events,
      cache,
      cards,
      settings,
      auth: AuthApi::new(gateway),
      uploads,
      flashcards,
      notifications,
      preferences,
      suggester,
    })
  }

  /// Run one command. API failures come back as a single user-facing line.
  pub async fn run(&mut self, command: Command) -> Result<()> {
    let outcome = self.dispatch(command).await;
    self.apply_session_events();
    let swept = self.cache.sweep();
    if swept > 0 {
      debug!(swept, "expired queries dropped");
    }
    match outcome {
      Ok(()) => Ok(()),
      Err(e) => {
        if e.is_validation() {
          debug!(error = %e, "command rejected");
        } else {
          warn!(error = ?e, "command failed");
        }
        Err(eyre!(e.user_message("Something went wrong. Please try again.")))
      }
    }
  }

  /// React to session changes published by the store or the gateway.
  fn apply_session_events(&mut self) {
    loop {
      match self.events.try_recv() {
        Ok(SessionEvent::LoggedIn(user)) => {
          info!(user = %user.email, "logged in");
          // A different account must not see the previous one's queries.
          self.cache.clear();
        }
        Ok(SessionEvent::UserUpdated(user)) => debug!(user = %user.email, "user updated"),
        Ok(SessionEvent::LoggedOut(reason)) => {
          info!(?reason, "logged out, dropping cached data");
          self.preferences.set_enabled(false);
          self.cache.clear();
          self.cards.clear();
        }
        Err(TryRecvError::Lagged(missed)) => warn!(missed, "session events lagged"),
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
  }

  async fn dispatch(&mut self, command: Command) -> Result<(), ApiError> {
    match command {
      Command::Register {
        name,
        email,
        password,
        confirm,
      } => {
        let confirm = confirm.unwrap_or_else(|| password.clone());
        let user = self.auth.register(&name, &email, &password, &confirm).await?;
        println!("Welcome, {}!", user.name);
      }
      Command::Login { email, password } => {
        let user = self.auth.login(&email, &password).await?;
        println!("Logged in as {}", describe_user(&user));
      }
      Command::Logout => {
        // Either call below may end the session on a 401.
        let was_authenticated = self.session.is_authenticated();
        // Unregister while the session can still authenticate the call.
        self.notifications.unregister_push().await;
        if self.auth.logout().await || was_authenticated {
          println!("Logged out");
        } else {
          println!("Not logged in");
        }
      }
      Command::Whoami => {
        self.require_session()?;
        let user = self.auth.me().await?;
        let session = match self.session.get_state().token {
          Some(SessionToken::Bearer(_)) => "token",
          Some(SessionToken::Cookie) => "cookie",
          None => "unknown",
        };
        println!("{} ({} session)", describe_user(&user), session);
      }
      Command::Profile(cmd) => self.profile(cmd).await?,
      Command::Password {
        current,
        new,
        confirm,
      } => {
        let confirm = confirm.unwrap_or_else(|| new.clone());
        let message = self.auth.change_password(&current, &new, &confirm).await?;
        println!("{}", message.as_deref().unwrap_or("Password changed"));
      }
      Command::ForgotPassword { email } => {
        let sent = self.auth.forgot_password(&email).await?;
        println!(
          "{}",
          sent.message.as_deref().unwrap_or("Check your inbox for a reset link")
        );
        if let Some(token) = sent.reset_token {
          println!("Reset token: {}", token);
        }
      }
      Command::ResetPassword {
        token,
        password,
        confirm,
      } => {
        let confirm = confirm.unwrap_or_else(|| password.clone());
        let message = self.auth.reset_password(&token, &password, &confirm).await?;
        println!("{}", message.as_deref().unwrap_or("Password reset"));
      }
      Command::Cards(cmd) => self.cards(cmd).await?,
      Command::Suggest { text } => self.suggest(&text).await,
      Command::Dictionary { word } => match self.flashcards.dictionary(&word).await {
        Some(entry) => {
          println!("{}", entry.word);
          if let Some(phonetic) = &entry.phonetic {
            println!("  {}", phonetic);
          }
          for meaning in &entry.meanings {
            let pos = meaning.part_of_speech.as_deref().unwrap_or("-");
            for def in &meaning.definitions {
              println!("  ({}) {}", pos, def.definition);
            }
          }
        }
        None => println!("No dictionary entry for '{}'", word.trim()),
      },
      Command::Upload(cmd) => self.upload(cmd).await?,
      Command::Notifications(cmd) => self.notification(cmd).await?,
      Command::Push(cmd) => self.push(cmd).await,
      Command::Settings(cmd) => self.settings(cmd)?,
    }
    Ok(())
  }

  fn require_session(&self) -> Result<(), ApiError> {
    if self.session.is_authenticated() {
      Ok(())
    } else {
      Err(ApiError::validation("Not logged in. Run `flashdeck login` first."))
    }
  }

  async fn profile(&self, cmd: ProfileCommand) -> Result<(), ApiError> {
    self.require_session()?;
    let user = match cmd {
      ProfileCommand::Show => self.auth.profile().await?,
      ProfileCommand::Update { name, avatar } => {
        self.auth.update_profile(ProfileUpdate { name, avatar }).await?
      }
    };
    println!("{}", describe_user(&user));
    if let Some(avatar) = &user.avatar {
      println!("avatar: {}", avatar);
    }
    Ok(())
  }

  async fn cards(&self, cmd: CardCommand) -> Result<(), ApiError> {
    self.require_session()?;
    match cmd {
      CardCommand::List {
        search,
        favorites,
        refresh,
      } => {
        let filter = CardFilter {
          search,
          favorites_only: favorites,
        };
        let (cards, offline_since) = if refresh {
          (self.flashcards.refresh(&filter).await?, None)
        } else {
          let result = self.flashcards.list(&filter).await?;
          let since = if result.is_offline() { result.cached_at } else { None };
          (result.data, since)
        };
        if let Some(since) = offline_since {
          println!("(offline: showing cards saved {})", since.format("%Y-%m-%d %H:%M"));
        }
        if cards.is_empty() {
          println!("No cards");
        }
        for card in &cards {
          println!("{}", card_line(card));
        }
      }
      CardCommand::Show { id } => {
        let card = self.flashcards.detail(&id).await?;
        print_card(&card);
      }
      CardCommand::Add(args) => {
        let card = self.add_card(args).await?;
        println!("Added {}", card_line(&card));
      }
      CardCommand::Edit {
        id,
        word,
        meaning,
        example,
        image_url,
        audio_url,
      } => {
        let patch = FlashcardPatch {
          word,
          meaning,
          example,
          image_url,
          audio_url,
          is_favorite: None,
        };
        let card = self.flashcards.update(&id, patch).await?;
        println!("Updated {}", card_line(&card));
      }
      CardCommand::Delete { id } => {
        self.flashcards.delete(&id).await?;
        println!("Deleted {}", id.trim());
      }
      CardCommand::Favorite { id } => {
        let card = self.flashcards.toggle_favorite(&id).await?;
        println!("{}", card_line(&card));
      }
    }
    Ok(())
  }

  async fn add_card(&self, args: CardDraftArgs) -> Result<Flashcard, ApiError> {
    let mut draft = FlashcardDraft {
      word: args.word,
      meaning: args.meaning,
      example: args.example,
      image_path: args.image,
      audio_path: args.audio,
      is_favorite: args.favorite,
      ..Default::default()
    };
    if args.autofill {
      draft = self.flashcards.autofill(draft).await;
    }
    self.flashcards.submit_draft(draft).await
  }

  /// Feed the text one character at a time, the way a user would type it.
  async fn suggest(&mut self, text: &str) {
    let mut typed = String::new();
    for c in text.chars() {
      typed.push(c);
      self.suggester.input(&typed);
    }
    let words = match self.suggester.next().await {
      Some(found) => found.words.clone(),
      None => self.suggester.current().words.clone(),
    };
    if words.is_empty() {
      println!("No suggestions");
    }
    for word in words {
      println!("{}", word);
    }
  }

  async fn upload(&self, cmd: UploadCommand) -> Result<(), ApiError> {
    self.require_session()?;
    let files = match cmd {
      UploadCommand::Image { path } => vec![self.uploads.upload_image(&path).await?],
      UploadCommand::Audio { path } => vec![self.uploads.upload_audio(&path).await?],
      UploadCommand::Files { paths } => {
        let paths: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
        self.uploads.upload_files(&paths).await?
      }
    };
    for file in files {
      println!("{}", file.url);
    }
    Ok(())
  }

  async fn notification(&mut self, cmd: NotificationCommand) -> Result<(), ApiError> {
    self.require_session()?;
    // Enabled only here, so other commands never start a preferences fetch.
    self.preferences.set_enabled(true);
    match cmd {
      NotificationCommand::Prefs => {
        let prefs = self.preferences.fetch().await.into_result()?;
        print_preferences(&prefs);
      }
      NotificationCommand::SetPrefs {
        enabled,
        time,
        email,
        push,
      } => {
        let mut prefs = self.preferences.fetch().await.into_result()?;
        if let Some(enabled) = enabled {
          prefs.enabled = enabled;
        }
        if time.is_some() {
          prefs.daily_reminder_time = time;
        }
        if email.is_some() {
          prefs.email = email;
        }
        if push.is_some() {
          prefs.push = push;
        }
        let saved = self.notifications.update_preferences(&prefs).await?;
        print_preferences(&saved);
      }
      NotificationCommand::History {
        limit,
        page,
        kind,
        unread,
        read,
      } => {
        let read = match (unread, read) {
          (true, _) => Some(false),
          (false, true) => Some(true),
          (false, false) => None,
        };
        let params = NotificationHistoryParams {
          limit,
          page,
          kind,
          read,
        };
        let history = self.notifications.history(&params).await.into_result()?;
        println!(
          "page {}/{} ({} unread)",
          history.current_page,
          history.total_pages.max(1),
          history.unread_count()
        );
        for n in &history.notifications {
          let marker = if n.read { ' ' } else { '*' };
          println!("{} {:?} {}: {}", marker, n.kind, n.title, n.message);
        }
      }
    }
    Ok(())
  }

  async fn push(&self, cmd: PushCommand) {
    match cmd {
      PushCommand::Register { token, platform } => {
        if self.notifications.register_push(&token, &platform).await {
          println!("Push notifications registered");
        } else {
          println!("Push registration failed; notifications stay off for this device");
        }
      }
      PushCommand::Unregister => {
        if self.notifications.unregister_push().await {
          println!("Push notifications unregistered");
        } else {
          println!("No push token registered");
        }
      }
    }
  }

  fn settings(&self, cmd: SettingsCommand) -> Result<(), ApiError> {
    let settings = match cmd {
      SettingsCommand::Show => self.settings.get(),
      SettingsCommand::Set {
        theme,
        notifications,
        reminder,
        cards_per_session,
      } => self.settings.update(|s| {
        if let Some(theme) = theme {
          s.theme = theme;
        }
        if let Some(enabled) = notifications {
          s.notifications_enabled = enabled;
        }
        if let Some(time) = reminder {
          s.daily_reminder_time = time;
        }
        if let Some(n) = cards_per_session {
          s.cards_per_session = n;
        }
      })?,
      SettingsCommand::Reset => self.settings.reset(),
    };
    println!("theme: {}", settings.theme);
    println!("notifications: {}", on_off(settings.notifications_enabled));
    println!("daily reminder: {}", settings.daily_reminder_time);
    println!("cards per session: {}", settings.cards_per_session);
    Ok(())
  }
}

fn describe_user(user: &User) -> String {
  format!("{} <{}>", user.name, user.email)
}

fn card_line(card: &Flashcard) -> String {
  let star = if card.is_favorite { "*" } else { " " };
  format!("{} {}  {}: {}", star, card.id, card.word, card.meaning)
}

fn print_card(card: &Flashcard) {
  println!("{}", card_line(card));
  for (label, value) in [
    ("example", &card.example),
    ("image", &card.image_url),
    ("audio", &card.audio_url),
  ] {
    if let Some(value) = value {
      println!("  {}: {}", label, value);
    }
  }
}

fn print_preferences(prefs: &NotificationPreferences) {
  println!("daily reminder: {}", on_off(prefs.enabled));
  if let Some(time) = &prefs.daily_reminder_time {
    println!("reminder time: {}", time);
  }
  for (label, value) in [("email", prefs.email), ("push", prefs.push), ("sms", prefs.sms)] {
    if let Some(value) = value {
      println!("{}: {}", label, on_off(value));
    }
  }
}

fn on_off(value: bool) -> &'static str {
  if value {
    "on"
  } else {
    "off"
  }
}
