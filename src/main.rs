//! utero - menstrual cycle tracker
//!
//! Usage:
//!   utero setup --start 2024-01-01         → record the last period start
//!   utero status                           → phase and countdown to the next period
//!   utero calendar --month 2024-02         → month grid
//!   utero log --symptom Cramps --mood Sad  → log today
//!   utero advice nutrition                 → AI advice
//!   utero voice --input question.wav       → talk to the voice assistant
//!   utero proxy                            → text-to-speech proxy

use anyhow::{anyhow, bail, Context};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utero::config::{elevenlabs_api_key, gemini_api_key, UteroConfig, CONFIG_FILE};
use utero::render::{render_month, render_progress};
use utero_core::{
    build_month, parse_date, CycleClock, CyclePhase, CycleProfile, Mood, TranscriptEntry, TranscriptSource,
    COMMON_SYMPTOMS,
};
use utero_gateway::{start_proxy, ElevenLabsClient, SpeechSynthesizer};
use utero_llm::{AdviceClient, GeminiProvider, ProductPreferences};
use utero_store::{JsonStore, Tracker};
use utero_tools::create_default_registry;
use utero_voice::{GeminiLiveTransport, VoiceEvent, VoiceSessionController, VoiceState, WavDevices};

#[derive(Parser)]
#[command(
    name = "utero",
    about = "Menstrual cycle tracker with AI advice and a voice assistant",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (TOML)
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the last period start and cycle lengths
    Setup {
        /// First day of the last period (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        start: NaiveDate,
        /// Days from one period start to the next (20-45)
        #[arg(long, default_value_t = 28)]
        cycle_length: u32,
        /// Days of bleeding (2-10)
        #[arg(long, default_value_t = 5)]
        period_length: u32,
    },
    /// Show the current phase and the countdown to the next period
    Status,
    /// Print a month grid
    Calendar {
        /// Month to show (YYYY-MM); defaults to the current month
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, i32)>,
    },
    /// Log symptoms and mood for a day
    Log {
        /// Day to log (YYYY-MM-DD); defaults to today
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
        /// Symptom to record; repeat for several. Replaces the day's list.
        #[arg(long = "symptom", value_parser = parse_symptom)]
        symptoms: Vec<String>,
        /// Remove every symptom logged for the day
        #[arg(long, conflicts_with = "symptoms")]
        clear_symptoms: bool,
        /// Mood: "Very Sad", Sad, Neutral, Happy, "Very Happy"
        #[arg(long)]
        mood: Option<Mood>,
    },
    /// Ask the assistant for advice
    Advice {
        #[command(subcommand)]
        topic: AdviceTopic,
    },
    /// Talk to the voice assistant using WAV files as microphone and speaker
    Voice {
        /// WAV file played into the session as microphone input
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the assistant's audio
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Stop the session after this many seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
    /// Start the text-to-speech proxy
    Proxy,
    /// Delete the profile and every logged day
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum AdviceTopic {
    /// Advice for the symptoms and mood logged on a day
    Symptoms {
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// A short uplifting quote for a mood
    Mood {
        /// Defaults to the mood logged today
        mood: Option<Mood>,
    },
    /// Foods to eat and avoid in a cycle phase
    Nutrition {
        /// Defaults to the current phase
        #[arg(long, value_parser = parse_phase)]
        phase: Option<CyclePhase>,
    },
    /// Healthier alternatives for a craving
    Craving {
        craving: Vec<String>,
    },
    /// Menstrual product recommendations
    Products {
        #[arg(long, default_value = "Medium")]
        flow: String,
        #[arg(long, default_value = "Moderate")]
        activity: String,
        /// Product type of interest; repeat for several
        #[arg(long = "prefer")]
        preferences: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let mut config = UteroConfig::load(&cli.config);
    config.apply_env();
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    run_command(cli.command, &config).await
}

fn init_tracing(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "utero.log".into());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "utero=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

fn open_tracker(config: &UteroConfig) -> anyhow::Result<Tracker> {
    let store = JsonStore::open(&config.storage.data_dir)
        .with_context(|| format!("opening data directory {}", config.storage.data_dir.display()))?;
    Ok(Tracker::open(store))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn require_profile(tracker: &Tracker) -> anyhow::Result<CycleProfile> {
    tracker
        .profile()
        .ok_or_else(|| anyhow!("No cycle data yet; run `utero setup --start YYYY-MM-DD` first"))
}

async fn run_command(command: Commands, config: &UteroConfig) -> anyhow::Result<()> {
    let tracker = || open_tracker(config).map(Arc::new);
    match command {
        Commands::Setup {
            start,
            cycle_length,
            period_length,
        } => {
            let profile = CycleProfile::new(start, cycle_length, period_length)?;
            let tracker = tracker()?;
            tracker.set_profile(profile.clone());
            println!(
                "Saved: last period {}, {}-day cycle, {}-day period",
                profile.last_period_start(),
                profile.cycle_length(),
                profile.period_length()
            );
            print_status(&profile, &tracker);
        }

        Commands::Status => {
            let tracker = tracker()?;
            let profile = require_profile(&tracker)?;
            print_status(&profile, &tracker);
        }

        Commands::Calendar { month } => {
            let tracker = tracker()?;
            let profile = require_profile(&tracker)?;
            let today = today();
            let (year, month0) = month.unwrap_or((today.year(), today.month0() as i32));
            let cells = build_month(year, month0, &profile, &tracker.symptom_log(), &tracker.mood_log(), today);
            print!("{}", render_month(&cells));
        }

        Commands::Log {
            date,
            symptoms,
            clear_symptoms,
            mood,
        } => {
            let tracker = tracker()?;
            let date = date.unwrap_or_else(today);
            if clear_symptoms || !symptoms.is_empty() {
                tracker.set_symptoms(date, symptoms);
            }
            if let Some(mood) = mood {
                tracker.set_mood(date, mood);
            }
            print_day(&tracker, date);
        }

        Commands::Advice { topic } => {
            let advice = advice_client(config)?;
            run_advice(topic, &advice, &*tracker()?).await?;
        }

        Commands::Voice { input, output, seconds } => {
            run_voice(config, tracker()?, input, output, seconds).await?;
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("This deletes your cycle data and every logged day. Re-run with --yes to confirm.");
            }
            tracker()?.clear_all();
            println!("All data cleared.");
        }

        Commands::Proxy => {
            let synthesizer = elevenlabs_api_key()
                .map(|key| Arc::new(ElevenLabsClient::new(key)) as Arc<dyn SpeechSynthesizer>);
            start_proxy(config.proxy.clone(), synthesizer).await?;
        }

        Commands::Config => print!("{}", config.to_toml()),
    }
    Ok(())
}

fn print_status(profile: &CycleProfile, tracker: &Tracker) {
    let today = today();
    let clock = CycleClock::new(profile);
    print!("{}", render_progress(&clock.progress(today), clock.current_phase(today)));
    print_day(tracker, today);
}

fn print_day(tracker: &Tracker, date: NaiveDate) {
    let symptoms = tracker.symptoms_on(date);
    let mood = tracker.mood_on(date);
    println!(
        "{}: symptoms: {}; mood: {}",
        date,
        if symptoms.is_empty() { "none".to_string() } else { symptoms.join(", ") },
        mood.map(|m| m.to_string()).unwrap_or_else(|| "not logged".to_string())
    );
}

// ============================================================
// Advice
// ============================================================

fn advice_client(config: &UteroConfig) -> anyhow::Result<AdviceClient> {
    let key = gemini_api_key().ok_or_else(|| anyhow!("GEMINI_API_KEY not set"))?;
    let mut provider = GeminiProvider::new(key);
    if let Some(url) = &config.advice.base_url {
        provider = provider.with_base_url(url.clone());
    }
    Ok(AdviceClient::new(Arc::new(provider)).with_model(config.advice.model.clone()))
}

async fn run_advice(topic: AdviceTopic, advice: &AdviceClient, tracker: &Tracker) -> anyhow::Result<()> {
    match topic {
        AdviceTopic::Symptoms { date } => {
            let date = date.unwrap_or_else(today);
            let text = advice
                .symptom_advice(&tracker.symptoms_on(date), tracker.mood_on(date))
                .await?;
            println!("{}", text);
        }
        AdviceTopic::Mood { mood } => {
            let mood = mood
                .or_else(|| tracker.mood_on(today()))
                .ok_or_else(|| anyhow!("No mood given and none logged today"))?;
            println!("{}", advice.mood_quote(mood).await?);
        }
        AdviceTopic::Nutrition { phase } => {
            let phase = match phase {
                Some(p) => p,
                None => tracker
                    .profile()
                    .map(|p| CycleClock::new(&p).current_phase(today()))
                    .unwrap_or(CyclePhase::Unknown),
            };
            let nutrition = advice.nutrition_advice(phase).await?;
            println!("{} phase", phase);
            println!("Foods to eat:");
            for food in &nutrition.foods_to_eat {
                println!("  + {}", food);
            }
            println!("Foods to avoid:");
            for food in &nutrition.foods_to_avoid {
                println!("  - {}", food);
            }
        }
        AdviceTopic::Craving { craving } => {
            println!("{}", advice.craving_advice(&craving.join(" ")).await?);
        }
        AdviceTopic::Products {
            flow,
            activity,
            preferences,
        } => {
            let prefs = ProductPreferences {
                flow,
                activity,
                preferences,
            };
            for rec in advice.product_recommendations(&prefs).await? {
                println!("{} ({})", rec.product_name, rec.product_type);
                println!("  {}", rec.recommendation);
            }
        }
    }
    Ok(())
}

// ============================================================
// Voice
// ============================================================

/// Prints transcript entries incrementally as fragments arrive.
#[derive(Default)]
struct TranscriptPrinter {
    printed: Vec<usize>,
}

impl TranscriptPrinter {
    fn update(&mut self, index: usize, entry: &TranscriptEntry) {
        if index >= self.printed.len() {
            if index > 0 {
                println!();
            }
            let label = match entry.source {
                TranscriptSource::User => "You",
                TranscriptSource::Model => "Assistant",
            };
            print!("{}: ", label);
            self.printed.resize(index + 1, 0);
        }
        let done = self.printed[index];
        if let Some(new) = entry.text.get(done..) {
            print!("{}", new);
        }
        self.printed[index] = entry.text.len();
        std::io::stdout().flush().ok();
    }
}

async fn run_voice(
    config: &UteroConfig,
    tracker: Arc<Tracker>,
    input: PathBuf,
    output: Option<PathBuf>,
    seconds: u64,
) -> anyhow::Result<()> {
    let key = gemini_api_key().ok_or_else(|| anyhow!("GEMINI_API_KEY not set"))?;
    let transport = Arc::new(GeminiLiveTransport::new(key).with_endpoint(config.voice.endpoint.clone()));
    let mut devices = WavDevices::new(input);
    if let Some(output) = output {
        devices = devices.with_output(output);
    }

    let controller = VoiceSessionController::new(
        config.voice.to_voice_config(),
        transport,
        Arc::new(devices),
        create_default_registry(tracker),
    );
    let mut events = controller.subscribe();
    controller.start().await?;
    info!("Voice session started; Ctrl-C to stop");

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printer = TranscriptPrinter::default();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(VoiceEvent::Transcript { index, entry }) => printer.update(index, &entry),
                Ok(VoiceEvent::ToolCall { name, is_error, .. }) => {
                    println!();
                    if is_error {
                        println!("[{} failed]", name);
                    } else {
                        println!("[logged via {}]", name);
                    }
                }
                Ok(VoiceEvent::Error(message)) => eprintln!("\nError: {}", message),
                Ok(VoiceEvent::State(VoiceState::Idle)) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Dropped {} voice events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }
    println!();

    // let queued audio finish before cutting the output
    let remaining = controller.playback_remaining();
    if remaining > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(remaining.min(30.0))).await;
    }
    controller.stop().await;
    Ok(())
}

// ============================================================
// Argument parsers
// ============================================================

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("expected YYYY-MM-DD, got {:?}", s))
}

fn parse_month(s: &str) -> Result<(i32, i32), String> {
    let (year, month) = s
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
    let year: i32 = year.parse().map_err(|_| format!("invalid year {:?}", year))?;
    let month: i32 = month.parse().map_err(|_| format!("invalid month {:?}", month))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 1-12, got {}", month));
    }
    Ok((year, month - 1))
}

fn parse_symptom(s: &str) -> Result<String, String> {
    COMMON_SYMPTOMS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(s.trim()))
        .map(|known| known.to_string())
        .ok_or_else(|| format!("unknown symptom {:?}; expected one of: {}", s, COMMON_SYMPTOMS.join(", ")))
}

fn parse_phase(s: &str) -> Result<CyclePhase, String> {
    [
        CyclePhase::Menstrual,
        CyclePhase::Follicular,
        CyclePhase::Ovulatory,
        CyclePhase::Luteal,
    ]
    .into_iter()
    .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    .ok_or_else(|| format!("unknown phase {:?}", s))
}
