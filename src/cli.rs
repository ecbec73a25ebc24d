use crate::api::{ApiClient, HttpClipStore, NewSession, SessionKind};
use crate::audio::{CaptureConfig, CpalBackend, CpalOutput, Player, Recorder};
use crate::config::{AuthToken, Config};
use crate::room::{Identity, MessageKind, NatsRoomChannel, Participant, RoomController, RoomSync};
use crate::transcribe::{LiveTranscriber, NatsSpeechFactory};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

#[derive(Parser)]
#[command(name = "parley", about = "Client for a group-discussion and interview practice platform")]
pub struct Cli {
    /// Config file (without extension), as loaded by the config crate
    #[arg(long, default_value = "config/parley")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    GroupDiscussion,
    Interview,
}

impl From<KindArg> for SessionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::GroupDiscussion => SessionKind::GroupDiscussion,
            KindArg::Interview => SessionKind::Interview,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new practice session
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value = "group-discussion")]
        kind: KindArg,
        /// Session length in minutes
        #[arg(long, default_value_t = 60)]
        duration: u32,
        #[arg(long, default_value_t = 6)]
        max_participants: u32,
        #[arg(long, default_value_t = 2)]
        ai_participants: u32,
        #[arg(long, default_value_t = 2)]
        real_participants: u32,
    },

    /// List your sessions
    Sessions,

    /// Inspect and join a session via its share link
    Join { share_link: String },

    /// Enter a session room (interactive)
    Room {
        session_id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: String,
    },

    /// Show the performance analysis for a finished session
    Analysis { session_id: String },

    /// End a running session
    End { session_id: String },
}

pub async fn run(cli: Cli, cfg: Config) -> Result<()> {
    let token = AuthToken::load(&cfg.auth)?;
    let api = ApiClient::new(&cfg.api.base_url, token.clone());

    match cli.command {
        Command::Create {
            title,
            topic,
            description,
            kind,
            duration,
            max_participants,
            ai_participants,
            real_participants,
        } => {
            let session = api
                .create_session(&NewSession {
                    title,
                    description,
                    scheduled_time: None,
                    duration,
                    kind: kind.into(),
                    topic,
                    max_participants,
                    ai_participants,
                    real_participants,
                })
                .await?;

            println!("Created session {} ({})", session.id, session.title);
            if let Some(link) = &session.share_link {
                println!("Share link: {link}");
            }
            Ok(())
        }

        Command::Sessions => {
            let sessions = api.my_sessions().await?;
            if sessions.is_empty() {
                println!("No sessions yet.");
            }
            for s in sessions {
                println!(
                    "{}  {:<30}  {}  [{}]",
                    s.id,
                    s.title,
                    s.kind,
                    s.status.as_deref().unwrap_or("unknown")
                );
            }
            Ok(())
        }

        Command::Join { share_link } => {
            let session = api.session_by_link(&share_link).await?;
            println!("{} - {}", session.title, session.topic);
            if let Some(description) = &session.description {
                println!("{description}");
            }

            api.join_by_link(&share_link).await?;
            println!("Joined. Enter the room with: parley room {}", session.id);
            Ok(())
        }

        Command::Room {
            session_id,
            user_id,
            user_name,
        } => run_room(&cfg, &api, token, session_id, user_id, user_name).await,

        Command::Analysis { session_id } => {
            let report = api.analysis_or_generate(&session_id).await?;
            render_analysis(&report);
            Ok(())
        }

        Command::End { session_id } => {
            api.end_session(&session_id).await?;
            println!("Session ended. View the report with: parley analysis {session_id}");
            Ok(())
        }
    }
}

async fn run_room(
    cfg: &Config,
    api: &ApiClient,
    token: Option<AuthToken>,
    session_id: String,
    user_id: String,
    user_name: String,
) -> Result<()> {
    // Fatal-to-the-view failure: a dedicated error screen, not a crash
    let session = match api.get_session(&session_id).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Could not open the session room.");
            eprintln!("  {e}");
            eprintln!("Check the session id, or list your sessions with: parley sessions");
            return Err(e.into());
        }
    };

    println!("{} - {}", session.title, session.topic);

    // Personas come from the bot roster when it exists; until the backend has
    // initialized it, generic placeholder names stand in
    let personas: Vec<Participant> = if session.ai_participants > 0 {
        match api.list_bots(&session_id).await {
            Ok(bots) if !bots.is_empty() => bots.iter().map(Participant::from_bot).collect(),
            _ => (0..session.ai_participants)
                .map(Participant::generic_automated)
                .collect(),
        }
    } else {
        Vec::new()
    };

    let nats = async_nats::connect(&cfg.channel.url)
        .await
        .context("Failed to connect to channel server")?;

    let channel = Arc::new(NatsRoomChannel::with_client(nats.clone(), session_id.clone()));
    let mut sync = RoomSync::new(
        channel,
        Identity {
            room_id: session_id.clone(),
            user_id,
            user_name,
        },
    );
    sync.join().await?;
    sync.seed_automated(personas);

    let recorder = Recorder::new(Box::new(CpalBackend::new(CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        ..CaptureConfig::default()
    })));
    let transcriber =
        LiveTranscriber::new(Arc::new(NatsSpeechFactory::new(nats, session_id.clone())));
    let store = Arc::new(HttpClipStore::new(&cfg.api.base_url, token));

    let mut controller = RoomController::new(recorder, transcriber, store, sync);
    let mut player = Player::new(Arc::new(CpalOutput::new()));

    println!("Commands: /record  /stop  /who  /play <n>  /end  /quit - anything else is sent as a message.");

    let mut rendered = 0usize;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        rendered = render_new_messages(&controller, rendered);
        if let Some(banner) = controller.banner() {
            println!("! {banner}");
        }
        if controller.is_recording() {
            let transcript = controller.live_transcript();
            if !transcript.is_empty() {
                println!("~ live transcript: \"{transcript}\"");
            }
        }

        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "/quit" => break,
            "/record" => {
                if controller.is_uploading() {
                    println!("Still sending the previous recording.");
                } else if controller.start_recording().await.is_ok() {
                    println!("Recording... stop with /stop");
                }
            }
            "/stop" => {
                controller.stop_recording().await;
            }
            "/who" => {
                let participants = controller.participants();
                println!("Participants ({}):", participants.len());
                for p in participants {
                    let marker = if p.is_automated() { "[ai]" } else { "    " };
                    println!("  {} {}", marker, p.name());
                }
            }
            "/end" => {
                api.end_session(&session_id).await?;
                println!("Session ended. View the report with: parley analysis {session_id}");
                break;
            }
            other if other.starts_with("/play") => {
                let index: usize = other
                    .split_whitespace()
                    .nth(1)
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                let messages = controller.messages();
                match messages
                    .iter()
                    .filter(|m| m.kind == MessageKind::Audio)
                    .nth(index)
                    .and_then(|m| m.audio_url.clone())
                {
                    Some(url) => match player.load(&url).await {
                        Ok(()) => {
                            let _ = player.play();
                            println!("Playing ({:.0}s)...", player.duration_seconds());
                        }
                        Err(e) => println!("! {e}"),
                    },
                    None => println!("No audio message #{index}."),
                }
            }
            "" => {}
            text => {
                // send_text reports whether anything was emitted; a blank
                // composer stays untouched either way
                let _ = controller.send_text(text).await?;
            }
        }
    }

    controller.sync_mut().leave();
    Ok(())
}

fn render_new_messages(controller: &RoomController, rendered: usize) -> usize {
    let messages = controller.messages();
    for message in &messages[rendered.min(messages.len())..] {
        let time = message.timestamp.format("%H:%M:%S");
        match message.kind {
            MessageKind::Text => {
                println!("[{}] {}: {}", time, message.user_name, message.content);
            }
            MessageKind::Audio => {
                println!(
                    "[{}] {}: [audio] {} - \"{}\"",
                    time,
                    message.user_name,
                    message.audio_url.as_deref().unwrap_or(""),
                    message.transcript.as_deref().unwrap_or("")
                );
            }
        }
    }
    messages.len()
}

fn render_analysis(report: &crate::api::AnalysisReport) {
    println!("{} - {}", report.session.title, report.session.topic);
    println!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M"));
    println!();
    println!("Summary: {}", report.overall.summary);
    println!(
        "Engagement {:.0}  Collaboration {:.0}  Topic relevance {:.0}",
        report.overall.engagement, report.overall.collaboration, report.overall.topic_relevance
    );

    if !report.overall.key_points.is_empty() {
        println!("Key points:");
        for point in &report.overall.key_points {
            println!("  - {point}");
        }
    }

    for participant in &report.participants {
        println!();
        println!(
            "{} (score {:.0})",
            participant.user_name, participant.feedback.overall_score
        );
        println!(
            "  speaking {:.0}s, {} contributions, clarity {:.0}, confidence {:.0}",
            participant.participation.speaking_time,
            participant.participation.contributions,
            participant.participation.clarity,
            participant.participation.confidence
        );
        for s in &participant.feedback.strengths {
            println!("  + {s}");
        }
        for s in &participant.feedback.improvements {
            println!("  - {s}");
        }
        for s in &participant.feedback.suggestions {
            println!("  > {s}");
        }
    }
}
