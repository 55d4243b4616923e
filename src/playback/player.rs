// Playback engine: a dedicated thread owns the decoder and the output
// stream; the rest of the app talks to it through control messages and
// shared atomics, so the UI thread never blocks on audio work.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;

use super::decoder::TrackDecoder;
use super::output::AudioOutput;
use super::resample::Resampler;

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Progress {
        position_ms: i64,
        duration_ms: Option<i64>,
    },
    TrackEnded {
        path: PathBuf,
    },
    Error {
        message: String,
    },
}

enum Control {
    Play(PathBuf),
    Pause,
    Resume,
    Stop,
    Seek(i64),
    SetVolume(f32),
}

#[derive(Default)]
struct SharedState {
    playing: AtomicBool,
    paused: AtomicBool,
    position_ms: AtomicI64,
    duration_ms: AtomicI64, // -1 when unknown
    current: Mutex<Option<PathBuf>>,
    volume: Mutex<f32>,
}

pub struct Player {
    control: Sender<Control>,
    shared: Arc<SharedState>,
}

impl Player {
    /// Start the playback thread. `on_event` is called from that thread.
    pub fn spawn<F>(initial_volume: f32, on_event: F) -> Self
    where
        F: Fn(PlayerEvent) + Send + 'static,
    {
        let (control, commands) = mpsc::channel();
        let shared = Arc::new(SharedState {
            duration_ms: AtomicI64::new(-1),
            volume: Mutex::new(initial_volume.clamp(0.0, 1.0)),
            ..Default::default()
        });

        let worker_shared = shared.clone();
        std::thread::spawn(move || run(commands, worker_shared, on_event));

        Self { control, shared }
    }

    pub fn play(&self, path: PathBuf) {
        let _ = self.control.send(Control::Play(path));
    }

    pub fn pause(&self) {
        let _ = self.control.send(Control::Pause);
    }

    pub fn resume(&self) {
        let _ = self.control.send(Control::Resume);
    }

    pub fn stop(&self) {
        let _ = self.control.send(Control::Stop);
    }

    pub fn seek(&self, position_ms: i64) {
        let _ = self.control.send(Control::Seek(position_ms));
    }

    pub fn set_volume(&self, volume: f32) {
        *self.shared.volume.lock() = volume.clamp(0.0, 1.0);
        let _ = self.control.send(Control::SetVolume(volume));
    }

    pub fn volume(&self) -> f32 {
        *self.shared.volume.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst) && !self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst) && self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> i64 {
        self.shared.position_ms.load(Ordering::SeqCst)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        let duration = self.shared.duration_ms.load(Ordering::SeqCst);
        (duration >= 0).then_some(duration)
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.shared.current.lock().clone()
    }
}

struct Session {
    decoder: TrackDecoder,
    output: AudioOutput,
    resampler: Option<Resampler>,
    path: PathBuf,
    in_channels: usize,
    out_channels: usize,
    queued: Vec<f32>,
    queued_offset: usize,
    frames_decoded: u64,
    draining: bool,
}

impl Session {
    fn start(path: &Path, volume: f32) -> Result<Self> {
        let decoder = TrackDecoder::open(path)?;
        let output = AudioOutput::open(volume)?;

        let in_channels = decoder.channels();
        let out_channels = output.channels() as usize;
        let resampler = if decoder.sample_rate() != output.sample_rate() {
            Some(Resampler::new(
                decoder.sample_rate(),
                output.sample_rate(),
                out_channels,
            )?)
        } else {
            None
        };

        Ok(Self {
            decoder,
            output,
            resampler,
            path: path.to_path_buf(),
            in_channels,
            out_channels,
            queued: Vec::new(),
            queued_offset: 0,
            frames_decoded: 0,
            draining: false,
        })
    }

    /// Push the next slice of audio towards the device.
    /// Ok(true) while the track still has audio in flight, Ok(false) once
    /// everything has been played out.
    fn pump(&mut self) -> Result<bool> {
        // First drain what is already converted into the ring buffer.
        if self.queued_offset < self.queued.len() {
            let written = self.output.write(&self.queued[self.queued_offset..]);
            self.queued_offset += written;
            if written == 0 {
                // Ring full; the device will catch up shortly
                std::thread::sleep(Duration::from_millis(5));
            }
            return Ok(true);
        }
        self.queued.clear();
        self.queued_offset = 0;

        if self.draining {
            if self.output.buffered() > 0 {
                std::thread::sleep(Duration::from_millis(10));
                return Ok(true);
            }
            return Ok(false);
        }

        match self.decoder.next_block()? {
            Some(block) => {
                let frames = block.len() / self.in_channels.max(1);
                if self.in_channels == self.out_channels && self.resampler.is_none() {
                    self.queued.extend_from_slice(block);
                } else {
                    let adapted = adapt_channels(block, self.in_channels, self.out_channels);
                    match self.resampler.as_mut() {
                        Some(resampler) => resampler.push(&adapted, &mut self.queued)?,
                        None => self.queued.extend_from_slice(&adapted),
                    }
                }
                self.frames_decoded += frames as u64;
            }
            None => {
                if let Some(resampler) = self.resampler.as_mut() {
                    resampler.flush(&mut self.queued)?;
                }
                self.draining = true;
            }
        }
        Ok(true)
    }

    /// Position of the decode clock, slightly ahead of what is audible.
    fn position_ms(&self) -> i64 {
        let rate = self.decoder.sample_rate().max(1);
        (self.frames_decoded as f64 / rate as f64 * 1000.0) as i64
    }

    fn seek(&mut self, position_ms: i64) -> Result<i64> {
        let actual = self.decoder.seek_to_ms(position_ms)?;
        self.frames_decoded =
            (actual as f64 * self.decoder.sample_rate() as f64 / 1000.0) as u64;
        self.queued.clear();
        self.queued_offset = 0;
        self.draining = false;
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.output.clear();
        Ok(actual)
    }
}

fn run<F: Fn(PlayerEvent)>(commands: Receiver<Control>, shared: Arc<SharedState>, on_event: F) {
    let mut session: Option<Session> = None;
    let mut last_progress_ms: i64 = i64::MIN;

    loop {
        let streaming = session.is_some()
            && shared.playing.load(Ordering::SeqCst)
            && !shared.paused.load(Ordering::SeqCst);

        let command = if streaming {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            }
        };

        if let Some(command) = command {
            match command {
                Control::Play(path) => {
                    session = None;
                    match Session::start(&path, *shared.volume.lock()) {
                        Ok(new_session) => {
                            shared.position_ms.store(0, Ordering::SeqCst);
                            shared.duration_ms.store(
                                new_session.decoder.duration_ms().unwrap_or(-1),
                                Ordering::SeqCst,
                            );
                            *shared.current.lock() = Some(path);
                            shared.playing.store(true, Ordering::SeqCst);
                            shared.paused.store(false, Ordering::SeqCst);
                            last_progress_ms = i64::MIN;
                            session = Some(new_session);
                        }
                        Err(e) => {
                            eprintln!("[Playback] Failed to start {}: {}", path.display(), e);
                            shared.playing.store(false, Ordering::SeqCst);
                            *shared.current.lock() = None;
                            on_event(PlayerEvent::Error {
                                message: e.to_string(),
                            });
                        }
                    }
                }
                Control::Pause => {
                    if session.is_some() {
                        shared.paused.store(true, Ordering::SeqCst);
                    }
                }
                Control::Resume => {
                    shared.paused.store(false, Ordering::SeqCst);
                }
                Control::Stop => {
                    session = None;
                    shared.playing.store(false, Ordering::SeqCst);
                    shared.paused.store(false, Ordering::SeqCst);
                    shared.position_ms.store(0, Ordering::SeqCst);
                    *shared.current.lock() = None;
                }
                Control::Seek(position_ms) => {
                    if let Some(s) = session.as_mut() {
                        match s.seek(position_ms) {
                            Ok(actual) => {
                                shared.position_ms.store(actual, Ordering::SeqCst);
                                last_progress_ms = i64::MIN;
                            }
                            Err(e) => eprintln!("[Playback] Seek failed: {}", e),
                        }
                    }
                }
                Control::SetVolume(volume) => {
                    if let Some(s) = session.as_ref() {
                        s.output.set_volume(volume);
                    }
                }
            }
            continue;
        }

        let Some(s) = session.as_mut() else { continue };
        match s.pump() {
            Ok(true) => {
                let position = s.position_ms();
                shared.position_ms.store(position, Ordering::SeqCst);
                if position.saturating_sub(last_progress_ms) >= 250 {
                    last_progress_ms = position;
                    on_event(PlayerEvent::Progress {
                        position_ms: position,
                        duration_ms: s.decoder.duration_ms(),
                    });
                }
            }
            Ok(false) => {
                let path = s.path.clone();
                if let Some(duration) = s.decoder.duration_ms() {
                    shared.position_ms.store(duration, Ordering::SeqCst);
                }
                session = None;
                shared.playing.store(false, Ordering::SeqCst);
                shared.paused.store(false, Ordering::SeqCst);
                on_event(PlayerEvent::TrackEnded { path });
            }
            Err(e) => {
                eprintln!("[Playback] {}", e);
                session = None;
                shared.playing.store(false, Ordering::SeqCst);
                *shared.current.lock() = None;
                on_event(PlayerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Map decoded frames onto the device channel count: mono is duplicated,
/// extra channels are dropped, missing channels repeat the last one.
fn adapt_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }
    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
    out
}
