#![allow(dead_code)]

use std::sync::Arc;

use pixgrid_engine::{Account, Engine, EngineConfig, MemoryStore};

pub fn setup(width: u32, height: u32) -> (Arc<MemoryStore>, Engine) {
    setup_with(width, height, EngineConfig::default())
}

pub fn setup_with(width: u32, height: u32, config: EngineConfig) -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(MemoryStore::new(width, height));
    let engine = Engine::new(store.clone(), config).unwrap();
    (store, engine)
}

/// Engine after the initial resync, signed in with `credits`.
pub async fn signed_in(width: u32, height: u32, credits: u64) -> (Arc<MemoryStore>, Engine, Account) {
    let (store, engine) = setup(width, height);
    let account = Account::new("alice");
    store.set_credits(&account, credits);
    engine.sign_in(account.clone()).await.unwrap();
    engine.resync().await.unwrap();
    (store, engine, account)
}
