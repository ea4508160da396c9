use std::time::Duration;

use repodrive_core::RemoteStore;

use super::clipboard::TransferMode;
use super::engine::{EngineError, EngineOptions, ErrorKind, MoveOrder, SyncEngine};
use super::paths::Location;
use super::tree::TreeCache;

use memory_store::{MemoryStore, Op};

mod folders;
mod paste;
mod wire;

fn options(move_order: MoveOrder) -> EngineOptions {
    EngineOptions {
        move_order,
        pacing: Duration::ZERO,
    }
}

fn loc(segments: &[&str]) -> Location {
    Location::new(std::iter::once("root").chain(segments.iter().copied())).unwrap()
}

/// Engine over `objects` with the given folders already listed.
async fn engine_with<'a>(
    objects: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    listed: &[&[&str]],
    move_order: MoveOrder,
) -> SyncEngine<MemoryStore> {
    let mut engine = SyncEngine::new(MemoryStore::with_objects(objects), TreeCache::default())
        .with_options(options(move_order));
    for folder in listed {
        engine.list_directory(&loc(folder)).await.unwrap();
    }
    engine
}

fn names<S: RemoteStore>(engine: &SyncEngine<S>, location: &Location) -> Vec<String> {
    engine
        .view(location)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

/// Store calls other than listings, in order.
fn mutations(engine: &SyncEngine<MemoryStore>) -> Vec<(Op, String)> {
    engine
        .store()
        .calls()
        .into_iter()
        .filter(|(op, _)| *op != Op::List)
        .collect()
}
