use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    time::{self, MissedTickBehavior},
};
use tracing::debug;
use vidquiz_core::{
    FetchState, HttpContentService, InMemoryRewardStore, PlaybackClock, QuizPrompt, QuizSession,
    SessionNotice, SimulatedClock, VidquizConfig, score_answers, youtube_video_id,
};

use crate::render;

/// Real time between simulated playback steps.
const PLAYBACK_STEP: Duration = Duration::from_millis(100);

#[derive(Args)]
pub struct WatchArgs {
    /// YouTube video URL
    url: String,

    /// Video length in seconds
    #[arg(short, long, default_value_t = 1200.0)]
    duration: f64,

    /// Simulated seconds of video per real second
    #[arg(short, long, default_value_t = 60.0)]
    speed: f64,

    /// Base URL of the transcript and quiz service
    #[arg(long)]
    service: Option<String>,

    /// Seconds between quiz boundaries
    #[arg(long)]
    interval: Option<f64>,

    /// Stars per correct answer
    #[arg(long)]
    points: Option<u32>,

    /// Answer every question correctly without reading stdin
    #[arg(long)]
    auto: bool,
}

impl WatchArgs {
    fn apply(&self, config: &mut VidquizConfig) -> Result<()> {
        anyhow::ensure!(
            self.duration.is_finite() && self.duration > 0.0,
            "--duration must be positive"
        );
        anyhow::ensure!(
            self.speed.is_finite() && self.speed > 0.0,
            "--speed must be positive"
        );

        if let Some(service) = &self.service {
            let service = service.trim().trim_end_matches('/');
            anyhow::ensure!(!service.is_empty(), "--service must not be empty");
            config.service.base_url = service.to_string();
        }
        if let Some(interval) = self.interval {
            anyhow::ensure!(
                interval.is_finite() && interval > 0.0,
                "--interval must be positive"
            );
            config.scheduler.boundary_interval_secs = interval;
        }
        if let Some(points) = self.points {
            config.scheduler.points_per_correct_answer = points;
        }
        Ok(())
    }
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn fetch_message(state: FetchState) -> &'static str {
    match state {
        FetchState::Idle => "Waiting for video duration...",
        FetchState::FetchingTranscript => "Transcribing video...",
        FetchState::FetchingQuiz => "Generating quizzes...",
        FetchState::Ready => "Quizzes ready",
        FetchState::Failed => "Quiz generation failed",
    }
}

/// Ask every question of `prompt`. Returns the number of correct answers and
/// whether the viewer quit early.
async fn take_quiz(
    prompt: &QuizPrompt,
    input: &mut Lines<BufReader<Stdin>>,
    auto: bool,
) -> Result<(u32, bool)> {
    println!(
        "\n{} {}",
        style(format!("Quiz {}", prompt.segment + 1)).cyan().bold(),
        style("(type a letter or number, q to close)").dim()
    );

    let total = prompt.questions.len();
    let mut chosen: Vec<Option<&str>> = Vec::with_capacity(total);
    let mut dismissed = false;

    for (i, question) in prompt.questions.iter().enumerate() {
        print!("{}", render::format_question(i + 1, total, question));

        let pick = if auto {
            question
                .options
                .iter()
                .find(|option| question.is_correct(option))
                .map(String::as_str)
        } else {
            let Some(line) = input.next_line().await.context("failed to read answer")? else {
                dismissed = true;
                break;
            };
            if line.trim().eq_ignore_ascii_case("q") {
                dismissed = true;
                break;
            }
            render::pick_option(question, &line)
        };

        println!("{}", render::format_verdict(question, pick));
        chosen.push(pick);
    }

    let answered = chosen.len();
    let correct = score_answers(&prompt.questions[..answered], &chosen);
    Ok((correct, dismissed))
}

pub async fn run(args: WatchArgs, mut config: VidquizConfig) -> Result<()> {
    args.apply(&mut config)?;
    let video_id = youtube_video_id(&args.url)?;

    println!(
        "\n{}  {}\n",
        style("vidquiz").cyan().bold(),
        style(format!(
            "{video_id} · {} at {}x",
            render::format_position(args.duration),
            args.speed
        ))
        .dim()
    );

    let clock = Arc::new(SimulatedClock::new());
    let store = Arc::new(InMemoryRewardStore::new());
    let service = Arc::new(HttpContentService::new(&config.service)?);
    let (session, mut notices) =
        QuizSession::start(&config.scheduler, clock.clone(), service, store.clone())?;

    let mut fetch = session.fetch_state();
    session.select_video(args.url.as_str()).await;
    clock.set_duration(args.duration);

    let mut spinner = Some(create_spinner(fetch_message(FetchState::Idle))?);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut playback = time::interval(PLAYBACK_STEP);
    playback.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let step = PLAYBACK_STEP.as_secs_f64() * args.speed;
    let mut ended = false;
    let mut fetch_open = true;

    loop {
        tokio::select! {
            notice = notices.recv() => {
                let Some(notice) = notice else { break };
                match notice {
                    SessionNotice::QuizzesReady { plan, playable, .. } => {
                        if let Some(pb) = spinner.take() {
                            pb.finish_with_message(format!(
                                "{} {playable} quizzes ready",
                                style("✓").green().bold()
                            ));
                        }
                        print!("{}", render::format_plan(&plan, args.duration));
                    }
                    SessionNotice::NoQuizzes { reason, .. } => {
                        if let Some(pb) = spinner.take() {
                            pb.finish_with_message(format!(
                                "{} No quizzes: {reason}",
                                style("✗").red().bold()
                            ));
                        }
                    }
                    SessionNotice::ShowQuiz(prompt) => {
                        println!(
                            "\n{} {}",
                            style("⏸").yellow(),
                            style(format!(
                                "Paused at {}",
                                render::format_position(clock.current_position())
                            ))
                            .dim()
                        );
                        let (correct, dismissed) = take_quiz(&prompt, &mut input, args.auto).await?;
                        if dismissed {
                            session.dismiss_quiz(correct).await;
                        } else {
                            session.complete_quiz(correct).await;
                        }
                    }
                    SessionNotice::RewardEarned { amount, total, .. } => {
                        println!("  {}", render::format_stars(amount, total));
                    }
                    SessionNotice::Finished { shown, .. } => {
                        debug!(?shown, "session finished");
                        break;
                    }
                }
            }
            changed = fetch.changed(), if fetch_open => {
                if changed.is_err() {
                    fetch_open = false;
                    continue;
                }
                let state = fetch.borrow_and_update().state;
                if let Some(pb) = &spinner {
                    pb.set_message(fetch_message(state));
                }
            }
            _ = playback.tick() => {
                if !ended && clock.advance(step) {
                    ended = true;
                    println!(
                        "\n{} {}",
                        style("■").dim(),
                        style("End of video").dim()
                    );
                    session.playback_ended().await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }
    session.shutdown().await;

    println!(
        "\n{} {}\n",
        style("Stars:").dim(),
        style(format!("{} ★", store.total().await)).yellow().bold()
    );
    Ok(())
}
