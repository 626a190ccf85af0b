// src/main.rs
//
// Demo runner. Each core's two periodic tasks run as threads, a scripted
// performance is fed to the MIDI receive path, and the effects output is fanned
// out to the codec and S/PDIF channels.
//
//   duosynth-engine [config.yaml]
//
// Set RUST_LOG=debug to see voice and parameter changes.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use duosynth::{
    AudioBuffer, AudioRouter, ChannelBank, EffectsAudio, EngineConfig, Result, SynthAudio,
    SynthCore, create_effects_core, create_synth_core,
};
use log::{error, info};

const CHANNELS: usize = 2;

/// Blocks in flight between the two audio threads.
const BLOCKS_IN_FLIGHT: usize = 4;

/// Milliseconds to wait, then bytes to send.
const SCRIPT: &[(u64, &[u8])] = &[
    (100, &[0x90, 60, 100]),
    (250, &[64, 90]),
    (250, &[67, 80]),
    (500, &[0xB0, 6, 30]),
    (400, &[5, 32]),
    (400, &[4, 110]),
    (600, &[0x80, 60, 0, 64, 0, 67, 0]),
    (1500, &[]),
];

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    info!(
        "duosynth starting: {} Hz, {}-frame blocks, {} voices",
        config.sample_rate, config.block_size, config.voices
    );

    let SynthCore {
        mut input,
        control: mut synth_control,
        audio: synth_audio,
        controllers,
    } = create_synth_core(&config)?;
    let effects = create_effects_core(&config, controllers)?;
    let mut effects_control = effects.control;
    let effects_audio = effects.audio;

    let mut bank = ChannelBank::new(config.block_size);
    let source = bank.add_channel("effects.left");
    let codec = bank.add_channel("codec.left");
    bank.add_channel("spdif.left");
    let mut router = AudioRouter::new();
    router.route(&bank, "effects.left", &["codec.left", "spdif.left"])?;

    let running = Arc::new(AtomicBool::new(true));
    let period = config.block_duration();

    // ─── Receive path ───
    let midi = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            for &(wait_ms, bytes) in SCRIPT {
                thread::sleep(Duration::from_millis(wait_ms));
                input.feed_all(bytes);
            }
            running.store(false, Ordering::Release);
        })
    };

    // ─── Background loops ───
    let synth_loop = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                synth_control.tick();
                thread::sleep(period);
            }
            info!(
                "Synth control stopped with {} voice(s) playing",
                synth_control.allocator().playing_count()
            );
        })
    };
    let effects_loop = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                effects_control.tick();
                thread::sleep(period);
            }
        })
    };

    // ─── Audio callbacks ───
    let (to_effects, effects_rx) = mpsc::sync_channel::<Box<[f32]>>(BLOCKS_IN_FLIGHT);
    let (to_synth, processed_rx) = mpsc::sync_channel::<Box<[f32]>>(BLOCKS_IN_FLIGHT);
    let frames = config.block_size;
    let block_len = frames * CHANNELS;

    let effects_thread =
        thread::spawn(move || effects_callback(effects_audio, effects_rx, to_synth, block_len));

    let synth_thread = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut audio: SynthAudio = synth_audio;
            let mut spare: Vec<Box<[f32]>> = (0..BLOCKS_IN_FLIGHT)
                .map(|_| vec![0.0; block_len].into_boxed_slice())
                .collect();
            let mut peak = 0.0f32;
            let mut blocks = 0u64;
            let mut next = Instant::now();

            while running.load(Ordering::Acquire) {
                // Route whatever the effects core has finished.
                while let Ok(block) = processed_rx.try_recv() {
                    bank.channel_mut(source).copy_from_slice(&block[..frames]);
                    router.process(&mut bank);
                    peak = bank.channel(codec).iter().fold(peak, |p, s| p.max(s.abs()));
                    spare.push(block);
                }

                if let Some(mut block) = spare.pop() {
                    audio.process(&mut AudioBuffer::new(&mut block, CHANNELS));
                    if to_effects.send(block).is_err() {
                        break;
                    }
                }

                blocks += 1;
                if blocks % 1500 == 0 {
                    info!("Output peak {:.3}", peak);
                    peak = 0.0;
                }

                next += period;
                if let Some(wait) = next.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }
            (blocks, audio.overruns())
        })
    };

    // The control loops only stop once the script has finished.
    if !join_logged("MIDI receive", midi) {
        running.store(false, Ordering::Release);
    }
    join_logged("Synth control", synth_loop);
    join_logged("Effects control", effects_loop);

    match (synth_thread.join(), effects_thread.join()) {
        (Ok((blocks, synth_overruns)), Ok(effects_overruns)) => info!(
            "Rendered {} blocks ({} synth / {} effects overruns)",
            blocks, synth_overruns, effects_overruns
        ),
        _ => error!("Audio thread panicked"),
    }
    Ok(())
}

/// Join a worker, logging a panic. Returns whether it finished normally.
fn join_logged(name: &str, handle: thread::JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            error!("{} thread panicked", name);
            false
        }
    }
}

/// Effects core audio task: runs whenever a synth block arrives, until the
/// synth side hangs up.
fn effects_callback(
    mut audio: EffectsAudio,
    blocks: mpsc::Receiver<Box<[f32]>>,
    processed: mpsc::SyncSender<Box<[f32]>>,
    block_len: usize,
) -> u64 {
    let mut out = vec![0.0; block_len];

    while let Ok(mut block) = blocks.recv() {
        audio.process(
            &AudioBuffer::new(&mut block, CHANNELS),
            &mut AudioBuffer::new(&mut out, CHANNELS),
        );
        block.copy_from_slice(&out);
        if processed.send(block).is_err() {
            break;
        }
    }
    audio.overruns()
}
