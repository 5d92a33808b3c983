use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use beacon_assistant::voice::{AudioBuffer, AudioPlayback, AudioSink, SpeechSynthesizer};
use beacon_assistant::{Config, Error, HttpClient, OpenAiAssistants, Session, TextToSpeech, VoiceAssistant};

/// Beacon Assistant - talk to an `OpenAI` assistant and hear it answer
#[derive(Parser)]
#[command(name = "beacon-assistant", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout belongs to the prompt
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,beacon_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("fatal: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));

    // A pending stdin read cannot be cancelled; don't wait on it
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Cancelled)) => {
            tracing::info!("interrupted");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    if matches!(cli.command, Some(Command::TestSpeaker)) {
        return test_speaker(cancel).await;
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let http = HttpClient::new(&config.api)?.with_cancel(cancel.clone());
    tracing::info!(base_url = http.base_url(), "remote client ready");
    let tts = TextToSpeech::new(http.clone(), &config.voice);
    let playback = AudioPlayback::new(config.voice.format)?.with_cancel(cancel.clone());

    if let Some(Command::TestTts { text }) = cli.command {
        return test_tts(&tts, &playback, &text).await;
    }

    let api = OpenAiAssistants::new(http);
    let session = Session::start(&api, &config.assistant).await?;

    let assistant =
        VoiceAssistant::new(&api, &tts, &playback, session, config.poll).with_cancel(cancel);
    tracing::info!(
        assistant_id = %assistant.session().assistant_id,
        conversation_id = %assistant.session().conversation_id,
        "session started"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let outcome = assistant.run(stdin, &mut stdout).await?;

    tracing::info!(?outcome, "assistant loop finished");
    Ok(())
}

/// Cancel `cancel` on the first Ctrl-C and exit on the second
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::debug!("interrupt received");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("second interrupt, exiting");
            std::process::exit(130);
        }
    });
}

/// Test speaker output with a sine wave
async fn test_speaker(cancel: CancellationToken) -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new(beacon_assistant::AudioFormat::default())?.with_cancel(cancel);

    // 2 seconds of 440Hz sine wave at 24kHz, 30% volume
    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let samples: Vec<i16> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 * 32767.0) as i16
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback
        .play_buffer(AudioBuffer {
            samples,
            channels: 1,
            sample_width: 2,
            sample_rate,
        })
        .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test TTS output without the assistant
async fn test_tts(tts: &TextToSpeech, playback: &AudioPlayback, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    println!("Synthesizing speech ({})...", tts.format());
    let audio = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.len());

    if audio.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            audio[0], audio[1], audio[2], audio[3]
        );
    }

    println!("Playing audio...");
    playback.play(&audio).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
