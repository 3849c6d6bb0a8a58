//! Sound effect metadata and the playback instance pool
//!
//! Decoding and mixing are left to the host. This module resolves sound keys
//! to files with base volume and pitch, bounds how many instances can be
//! alive at once through a shared [`SoundPool`], and streams each instance's
//! file in chunks under play/pause/stop control.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use super::loader::{ContentError, ContentPath, ResourceLoader, ResourceSource, read_meta_entry};

// ============================================================================
// Pool
// ============================================================================

/// Fixed number of playback slots
#[derive(Debug)]
pub struct SoundPool {
    slots: Vec<bool>,
}

impl SoundPool {
    /// Create a pool with `capacity` free slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![false; capacity],
        }
    }

    /// Claim the first free slot
    pub fn acquire(&mut self) -> Result<usize, ContentError> {
        let index = self
            .slots
            .iter()
            .position(|used| !used)
            .ok_or(ContentError::PoolExhausted {
                capacity: self.slots.len(),
            })?;
        self.slots[index] = true;
        Ok(index)
    }

    /// Return a slot. Returns false if it was not taken.
    pub fn release(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(used) if *used => {
                *used = false;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|used| **used).count()
    }
}

/// Pool shared between every sound reference of a loader
pub type SharedSoundPool = Arc<Mutex<SoundPool>>;

// ============================================================================
// Sound effects
// ============================================================================

/// Per-folder metadata entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundMeta {
    pub file_path: String,
    #[serde(default = "unit")]
    pub base_volume: f32,
    #[serde(default = "unit")]
    pub base_pitch: f32,
}

fn unit() -> f32 {
    1.0
}

/// Loaded sound metadata, able to spawn playback instances
#[derive(Debug)]
pub struct SoundFxReference {
    pub file_path: PathBuf,
    pub base_volume: f32,
    pub base_pitch: f32,
    pool: SharedSoundPool,
}

impl SoundFxReference {
    /// Claim a pool slot for a new playback instance
    pub fn create_effect(&self) -> Result<SoundFx, ContentError> {
        let slot = self
            .pool
            .lock()
            .map_err(|_| ContentError::LockPoisoned("sound pool"))?
            .acquire()?;
        Ok(SoundFx {
            slot,
            file_path: self.file_path.clone(),
            base_volume: self.base_volume,
            volume: 1.0,
            pitch: self.base_pitch,
            playback: Arc::new(Mutex::new(Playback::default())),
            pool: Arc::clone(&self.pool),
        })
    }
}

/// Playback state of a sound instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Bytes skipped at the start of every file (the WAV header)
pub const STREAM_HEADER_BYTES: u64 = 44;
/// Largest chunk handed out by one refill
pub const STREAM_CHUNK_BYTES: u64 = 4096;

#[derive(Debug)]
struct Playback {
    state: PlaybackState,
    position: u64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            state: PlaybackState::Stopped,
            position: STREAM_HEADER_BYTES,
        }
    }
}

/// A streamed playback instance. Its pool slot is returned when dropped.
///
/// Play state and stream position sit behind one lock per instance, shared
/// with any refill running on another thread.
#[derive(Debug)]
pub struct SoundFx {
    slot: usize,
    pub file_path: PathBuf,
    pub base_volume: f32,
    /// Per-instance volume
    pub volume: f32,
    pub pitch: f32,
    playback: Arc<Mutex<Playback>>,
    pool: SharedSoundPool,
}

impl SoundFx {
    /// Pool slot held by this instance
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Volume to hand to the mixer
    #[must_use]
    pub fn effective_volume(&self, master_volume: f32) -> f32 {
        master_volume * self.base_volume * self.volume
    }

    fn lock(&self) -> Result<MutexGuard<'_, Playback>, ContentError> {
        self.playback.lock().map_err(|_| ContentError::LockPoisoned("sound playback"))
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.lock().map_or(PlaybackState::Stopped, |playback| playback.state)
    }

    /// Start playing. A paused sound resumes; a stopped one starts over.
    pub fn play(&self) -> Result<(), ContentError> {
        let mut playback = self.lock()?;
        if playback.state == PlaybackState::Stopped {
            playback.position = STREAM_HEADER_BYTES;
        }
        playback.state = PlaybackState::Playing;
        Ok(())
    }

    /// Pause a playing sound
    pub fn pause(&self) -> Result<(), ContentError> {
        let mut playback = self.lock()?;
        if playback.state == PlaybackState::Playing {
            playback.state = PlaybackState::Paused;
        }
        Ok(())
    }

    /// Stop and rewind
    pub fn stop(&self) -> Result<(), ContentError> {
        let mut playback = self.lock()?;
        playback.state = PlaybackState::Stopped;
        playback.position = STREAM_HEADER_BYTES;
        Ok(())
    }

    /// Read the next chunk of the stream for the mixer.
    ///
    /// Returns `None` when the sound is not playing. Reaching the end of the
    /// file stops the sound and also returns `None`.
    pub fn refill(&self) -> Result<Option<Vec<u8>>, ContentError> {
        read_chunk(&self.playback, &self.file_path)
    }

    /// Run [`refill`](Self::refill) on its own thread
    pub fn spawn_refill(&self) -> JoinHandle<Result<Option<Vec<u8>>, ContentError>> {
        let playback = Arc::clone(&self.playback);
        let path = self.file_path.clone();
        thread::spawn(move || read_chunk(&playback, &path))
    }
}

fn read_chunk(playback: &Mutex<Playback>, path: &Path) -> Result<Option<Vec<u8>>, ContentError> {
    let mut playback = playback.lock().map_err(|_| ContentError::LockPoisoned("sound playback"))?;
    if playback.state != PlaybackState::Playing {
        return Ok(None);
    }

    let io = |e: std::io::Error| ContentError::Io(format!("{}: {e}", path.display()));
    let mut file = File::open(path).map_err(io)?;
    file.seek(SeekFrom::Start(playback.position)).map_err(io)?;
    let mut chunk = Vec::new();
    file.take(STREAM_CHUNK_BYTES).read_to_end(&mut chunk).map_err(io)?;

    if chunk.is_empty() {
        playback.state = PlaybackState::Stopped;
        playback.position = STREAM_HEADER_BYTES;
        return Ok(None);
    }
    playback.position += chunk.len() as u64;
    Ok(Some(chunk))
}

impl Drop for SoundFx {
    fn drop(&mut self) {
        if let Ok(mut pool) = self.pool.lock() {
            pool.release(self.slot);
        }
    }
}

/// [`ResourceSource`] resolving sound keys to files
#[derive(Debug)]
pub struct SoundFxSource {
    pool: SharedSoundPool,
}

impl SoundFxSource {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Arc::new(Mutex::new(SoundPool::new(capacity))),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SharedSoundPool {
        &self.pool
    }
}

impl ResourceSource for SoundFxSource {
    type Asset = SoundFxReference;

    fn load_item(
        &mut self,
        root: &Path,
        path: &ContentPath,
    ) -> Result<SoundFxReference, ContentError> {
        let meta = read_meta_entry::<SoundMeta>(root, path)?.unwrap_or_else(|| SoundMeta {
            file_path: format!("{}.wav", path.leaf()),
            base_volume: 1.0,
            base_pitch: 1.0,
        });
        Ok(SoundFxReference {
            file_path: path.directory(root).join(meta.file_path),
            base_volume: meta.base_volume,
            base_pitch: meta.base_pitch,
            pool: Arc::clone(&self.pool),
        })
    }
}

/// Reference-counted sound cache
pub type SoundFxLoader = ResourceLoader<SoundFxSource>;
