//! The human record contract.
//!
//! `HumanContract` is a handle over a [`KeyedStore`]. The host calls
//! [`init`](HumanContract::init) once at instantiation and
//! [`invoke`](HumanContract::invoke) for every request; each request names an
//! [`Operation`] and passes a flat list of string arguments.

use humanledger_core::KeyedStore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ContractConfig;
use crate::dispatch::{Operation, Response};
use crate::error::{ContractError, ContractResult};
use crate::record::{Human, RecordCodec};
use crate::scanner::{RangeScanner, ScanResult};

/// Records written by `initLedger`, in key index order.
const SEED_HUMANS: [(&str, &str); 2] = [
    ("Tanaka", "19900101"),
    ("Yamada", "19800401"),
];

pub struct HumanContract<S> {
    store: S,
    config: ContractConfig,
}

impl<S: KeyedStore> HumanContract<S> {
    /// Contract over `store` with the default key layout.
    pub fn new(store: S) -> Self {
        Self { store, config: ContractConfig::default() }
    }

    pub fn with_config(store: S, config: ContractConfig) -> ContractResult<Self> {
        config.validate().map_err(ContractError::InvalidConfig)?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Instantiation hook. Has no side effects.
    pub fn init(&self) -> Response {
        info!("human contract instantiated");
        Response::Success(Vec::new())
    }

    /// Request hook: resolve `function`, run it, and fold any error into
    /// an error response.
    pub fn invoke<A: AsRef<str>>(&self, function: &str, args: &[A]) -> Response {
        let arg_list: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        info!(function, args = ?arg_list, "invoke");

        let result = Operation::resolve(function).and_then(|op| self.execute(op, args));
        if let Err(err) = &result {
            warn!(function, error = %err, "invocation failed");
        }
        result.into()
    }

    /// Run a resolved operation.
    pub fn execute<A: AsRef<str>>(&self, op: Operation, args: &[A]) -> ContractResult<Vec<u8>> {
        match op {
            Operation::QueryHuman => self.query_human(args),
            Operation::InitLedger => self.init_ledger(args),
            Operation::CreateHuman => self.create_human(args),
            Operation::QueryAllHuman => self.query_all_human(args),
            Operation::ChangeHumanName => self.change_human_name(args),
        }
    }

    /// `queryHuman(key)`: the stored bytes, verbatim.
    pub fn query_human<A: AsRef<str>>(&self, args: &[A]) -> ContractResult<Vec<u8>> {
        Operation::QueryHuman.check_arity(args)?;
        let key = args[0].as_ref();
        let bytes = self.store.get(key)?;
        debug!(key, len = bytes.len(), "queryHuman");
        Ok(bytes)
    }

    /// `initLedger()`: write the seed humans. Arguments are ignored.
    pub fn init_ledger<A: AsRef<str>>(&self, _args: &[A]) -> ContractResult<Vec<u8>> {
        info!("initLedger start");
        for (index, (name, birthday)) in SEED_HUMANS.iter().enumerate() {
            let key = self.config.seed_key(index);
            let record = Human::new(*name, *birthday).to_record();
            self.store.put(&key, &RecordCodec::encode(&record))?;
            info!(key = %key, name, birthday, "added human");
        }
        info!("initLedger end");
        Ok(Vec::new())
    }

    /// `createHuman(key, name, birthday)`: write a new human, replacing any
    /// existing value at `key`.
    pub fn create_human<A: AsRef<str>>(&self, args: &[A]) -> ContractResult<Vec<u8>> {
        Operation::CreateHuman.check_arity(args)?;
        let key = args[0].as_ref();
        let human = Human::new(args[1].as_ref(), args[2].as_ref());

        self.store.put(key, &RecordCodec::encode(&human.to_record()))?;
        info!(key, name = %human.name, "createHuman");
        Ok(Vec::new())
    }

    /// `queryAllHuman()`: JSON array of `{"Key", "Record"}` objects for every
    /// key in the configured range. Arguments are ignored.
    pub fn query_all_human<A: AsRef<str>>(&self, _args: &[A]) -> ContractResult<Vec<u8>> {
        let results = self.query_range(&self.config.scan_start, &self.config.scan_end)?;
        let array: Vec<Value> = results.iter().map(ScanResult::to_json).collect();
        info!(results = array.len(), "queryAllHuman");
        Ok(Value::Array(array).to_string().into_bytes())
    }

    /// All decoded entries in `[start, end)`.
    pub fn query_range(&self, start: &str, end: &str) -> ContractResult<Vec<ScanResult>> {
        Ok(RangeScanner::scan(&self.store, start, end)?.collect())
    }

    /// `changeHumanName(key, name)`: rewrite the record's `name` field,
    /// keeping every other field.
    pub fn change_human_name<A: AsRef<str>>(&self, args: &[A]) -> ContractResult<Vec<u8>> {
        Operation::ChangeHumanName.check_arity(args)?;
        let key = args[0].as_ref();
        let new_name = args[1].as_ref();

        let bytes = self.store.get(key)?;
        let mut record = RecordCodec::decode(&bytes).map_err(|source| ContractError::DecodeFailure {
            key: key.to_string(),
            source,
        })?;
        record.set_field("name", new_name);

        self.store.put(key, &RecordCodec::encode(&record))?;
        info!(key, name = new_name, "changeHumanName");
        Ok(Vec::new())
    }
}

impl<S> std::fmt::Debug for HumanContract<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HumanContract")
            .field("config", &self.config)
            .finish()
    }
}
