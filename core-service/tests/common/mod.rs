#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{LoadGeneration, MediaBackend};
use bridge_traits::time::FixedClock;
use core_library::{MemoryStore, Song};
use core_runtime::config::CoreConfig;
use core_service::{CoreDependencies, CoreService};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(String, LoadGeneration),
    Play,
    Pause,
    Seek(f64),
}

/// Media backend that accepts every command and remembers it.
#[derive(Default)]
pub struct RecordingBackend {
    commands: Mutex<Vec<Command>>,
}

impl RecordingBackend {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: Command) -> BridgeResult<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl MediaBackend for RecordingBackend {
    async fn load(&self, url: &str, generation: LoadGeneration) -> BridgeResult<()> {
        self.record(Command::Load(url.to_string(), generation))
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record(Command::Play)
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(Command::Pause)
    }

    async fn seek(&self, seconds: f64) -> BridgeResult<()> {
        self.record(Command::Seek(seconds))
    }

    async fn current_time(&self) -> BridgeResult<f64> {
        Ok(0.0)
    }
}

pub const CLOCK_MILLIS: i64 = 1_700_000_000_000;

pub fn dependencies(backend: Arc<RecordingBackend>) -> CoreDependencies {
    CoreDependencies::new(Arc::new(MemoryStore::new()), backend)
        .with_clock(Arc::new(FixedClock::from_millis(CLOCK_MILLIS)))
}

pub fn service() -> (CoreService, Arc<RecordingBackend>) {
    service_with(CoreConfig::default())
}

pub fn service_with(config: CoreConfig) -> (CoreService, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::default());
    let service = CoreService::new(config, dependencies(backend.clone())).unwrap();
    (service, backend)
}

pub fn song(id: &str, title: &str) -> Song {
    Song::new(id).with_title(title).with_seconds(200.0)
}

/// Songs "1".."=n" titled "Song 01".."Song nn".
pub fn numbered_songs(n: usize) -> Vec<Song> {
    (1..=n)
        .map(|i| song(&i.to_string(), &format!("Song {:02}", i)))
        .collect()
}
