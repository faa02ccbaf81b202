//! The converter registry
//!
//! A [`PacketCache`] maps each shape (keyed by its [`TypeId`]) to the one
//! converter used for it. Entries come from three places: the seed table of
//! primitive and well-known converters that every cache starts with, explicit
//! registrations, and lazy derivation through [`crate::factory`] the first
//! time a shape is used.
//!
//! The table is append-only. Both it and the name-bytes table are held in an
//! [`ArcSwap`], so lookups never take a lock and never wait on a writer;
//! insertion copies the table and publishes the copy with a compare-and-swap.
//! When several threads derive the same shape at once, each builds its own
//! converter, the first insertion wins, and everyone returns the winner.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use lazy_static::lazy_static;

use crate::conv::{decode_value, encode_value, Converter, ConverterRef};
use crate::cursor::DecodedBlock;
use crate::decimal::Decimal;
use crate::dynamic::DynamicReader;
use crate::error::Fault;
use crate::factory;
use crate::prim::PrimitiveConverter;
use crate::shape::Shaped;
use crate::sink::ByteSink;
use crate::string::StringConverter;

/// Default for [`CacheConfig::initial_sink_capacity`]
pub const DEFAULT_SINK_CAPACITY: usize = 256;

/// Runtime settings of a [`PacketCache`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Bytes preallocated for the output of each `serialize` call
    pub initial_sink_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

/// How a cache entry came to exist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Seeded,
    Registered,
    Derived,
}

/// Type-erased converter, shared between the seed table and every cache
pub(crate) struct Seed {
    type_id: TypeId,
    type_name: &'static str,
    fixed_width: Option<usize>,
    converter: Arc<dyn Any + Send + Sync>,
}

/// Seed entry for a converter of `T`
pub(crate) fn seed<T: 'static, C: Converter<T>>(converter: C) -> Seed {
    let converter: ConverterRef<T> = Arc::new(converter);
    Seed {
        type_id: TypeId::of::<T>(),
        type_name: type_name::<T>(),
        fixed_width: converter.fixed_width(),
        converter: Arc::new(converter),
    }
}

fn seed_table() -> Vec<Seed> {
    #[allow(unused_mut)]
    let mut seeds = vec![
        seed::<u8, _>(PrimitiveConverter::new()),
        seed::<i8, _>(PrimitiveConverter::new()),
        seed::<u16, _>(PrimitiveConverter::new()),
        seed::<i16, _>(PrimitiveConverter::new()),
        seed::<u32, _>(PrimitiveConverter::new()),
        seed::<i32, _>(PrimitiveConverter::new()),
        seed::<u64, _>(PrimitiveConverter::new()),
        seed::<i64, _>(PrimitiveConverter::new()),
        seed::<f32, _>(PrimitiveConverter::new()),
        seed::<f64, _>(PrimitiveConverter::new()),
        seed::<bool, _>(PrimitiveConverter::new()),
        seed::<char, _>(PrimitiveConverter::new()),
        seed::<Decimal, _>(PrimitiveConverter::new()),
        seed::<String, _>(StringConverter),
    ];
    #[cfg(feature = "well_known")]
    seeds.extend(crate::well_known::seeds());
    seeds
}

lazy_static! {
    static ref SEEDS: Vec<Seed> = seed_table();
}

/// Nothing has used the entry yet; a registration may still replace it
const FRESH: u8 = 0;
/// The converter has been given to a caller and is final
const HANDED_OUT: u8 = 1;
/// A registration claimed the entry and is publishing its replacement
const RETIRED: u8 = 2;

/// The entry was retired by a registration before it could be claimed
struct Retired;

struct Entry {
    type_name: &'static str,
    origin: Origin,
    fixed_width: Option<usize>,
    /// Always holds a `ConverterRef<T>` for the `T` this entry is keyed by
    converter: Arc<dyn Any + Send + Sync>,
    /// One of `FRESH`, `HANDED_OUT` or `RETIRED`; only ever leaves `FRESH`
    state: AtomicU8,
}

impl Entry {
    fn new<T: 'static>(origin: Origin, converter: ConverterRef<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            origin,
            fixed_width: converter.fixed_width(),
            converter: Arc::new(converter),
            state: AtomicU8::new(FRESH),
        }
    }

    fn from_seed(seed: &Seed) -> Self {
        Self {
            type_name: seed.type_name,
            origin: Origin::Seeded,
            fixed_width: seed.fixed_width,
            converter: Arc::clone(&seed.converter),
            state: AtomicU8::new(FRESH),
        }
    }

    /// Marks the entry as handed out and recovers the typed converter, unless
    /// a registration retired it first
    fn claim<T: 'static>(&self) -> Result<Option<ConverterRef<T>>, Retired> {
        match self
            .state
            .compare_exchange(FRESH, HANDED_OUT, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(HANDED_OUT) => Ok(self
                .converter
                .downcast_ref::<ConverterRef<T>>()
                .map(Arc::clone)),
            Err(_) => Err(Retired),
        }
    }

    /// Claims the entry for replacement; fails once it has been handed out
    fn retire(&self) -> bool {
        matches!(
            self.state
                .compare_exchange(FRESH, RETIRED, Ordering::AcqRel, Ordering::Acquire),
            Ok(_) | Err(RETIRED)
        )
    }
}

type Table = HashMap<TypeId, Arc<Entry>>;

/// Registry of converters, with lazy derivation for shapes not yet seen
///
/// Build one at startup and pass it by reference; it is `Send + Sync` and
/// every method takes `&self`.
pub struct PacketCache {
    converters: ArcSwap<Table>,
    names: ArcSwap<HashMap<&'static str, Arc<[u8]>>>,
    config: CacheConfig,
}

impl PacketCache {
    /// Cache holding only the seed converters, with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> PacketCacheBuilder {
        PacketCacheBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the converter for `T`, deriving and caching it on first use.
    ///
    /// Concurrent first uses may each derive a converter; exactly one is kept,
    /// and every caller receives that one.
    pub fn converter<T: Shaped>(&self) -> Result<ConverterRef<T>, Fault> {
        if let Some(found) = self.lookup::<T>() {
            return Ok(found);
        }
        let built = factory::derive::<T>(self)?;
        let entry = Arc::new(Entry::new(Origin::Derived, Arc::clone(&built)));
        let winner = self.insert_first(TypeId::of::<T>(), Arc::clone(&entry));
        if !Arc::ptr_eq(&winner, &entry) {
            tracing::trace!(
                shape = type_name::<T>(),
                "discarding converter derived concurrently"
            );
        }
        match winner.claim::<T>() {
            Ok(found) => Ok(found.unwrap_or(built)),
            Err(Retired) => Ok(self.lookup::<T>().unwrap_or(built)),
        }
    }

    /// Returns the converter for `T` only if one is already cached
    #[must_use]
    pub fn lookup<T: 'static>(&self) -> Option<ConverterRef<T>> {
        loop {
            let table = self.converters.load();
            match table.get(&TypeId::of::<T>())?.claim::<T>() {
                Ok(found) => return found,
                // the registration that retired it publishes its replacement next
                Err(Retired) => std::hint::spin_loop(),
            }
        }
    }

    /// Whether a converter for `T` is cached, without handing it out
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_id(TypeId::of::<T>())
    }

    pub(crate) fn contains_id(&self, type_id: TypeId) -> bool {
        self.converters.load().contains_key(&type_id)
    }

    /// Where the cached converter for `T` came from
    #[must_use]
    pub fn origin<T: 'static>(&self) -> Option<Origin> {
        self.converters
            .load()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.origin)
    }

    /// Declared fixed width of the cached converter for `T`, if there is one
    /// and it is fixed-width
    #[must_use]
    pub fn fixed_width<T: 'static>(&self) -> Option<usize> {
        self.converters
            .load()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.fixed_width)
    }

    /// Number of cached converters
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.load().is_empty()
    }

    /// Registers `converter` as the converter for `T`.
    ///
    /// A seeded or registered entry that nothing has used yet is replaced, so
    /// the last registration before first use applies. Once the entry for `T`
    /// has been handed out the registration is refused and `false` is
    /// returned. Claiming an entry for use and retiring it for replacement
    /// are the same compare-and-swap, so exactly one of a racing first use
    /// and registration takes effect.
    pub fn register<T: 'static, C: Converter<T>>(&self, converter: C) -> bool {
        self.register_ref::<T>(Arc::new(converter))
    }

    /// [`register`](Self::register) for an already-shared converter
    pub fn register_ref<T: 'static>(&self, converter: ConverterRef<T>) -> bool {
        let type_id = TypeId::of::<T>();
        let entry = Arc::new(Entry::new(Origin::Registered, converter));
        let mut applied = false;
        self.converters.rcu(|table| match table.get(&type_id) {
            Some(existing) if !existing.retire() => {
                applied = false;
                Arc::clone(table)
            }
            _ => {
                applied = true;
                let mut next = (**table).clone();
                next.insert(type_id, Arc::clone(&entry));
                Arc::new(next)
            }
        });
        tracing::debug!(shape = type_name::<T>(), applied, "explicit converter registration");
        applied
    }

    /// Inserts `entry` unless `type_id` already has one, and returns whichever
    /// entry ends up in the table
    fn insert_first(&self, type_id: TypeId, entry: Arc<Entry>) -> Arc<Entry> {
        let mut winner = None;
        self.converters.rcu(|table| match table.get(&type_id) {
            Some(existing) => {
                winner = Some(Arc::clone(existing));
                Arc::clone(table)
            }
            None => {
                winner = Some(Arc::clone(&entry));
                let mut next = (**table).clone();
                next.insert(type_id, Arc::clone(&entry));
                Arc::new(next)
            }
        });
        winner.unwrap_or(entry)
    }

    /// UTF-8 bytes of a field name, shared by every record converter
    pub fn intern(&self, name: &'static str) -> Arc<[u8]> {
        if let Some(bytes) = self.names.load().get(name) {
            return Arc::clone(bytes);
        }
        let fresh: Arc<[u8]> = Arc::from(name.as_bytes());
        let mut winner = None;
        self.names.rcu(|names| match names.get(name) {
            Some(existing) => {
                winner = Some(Arc::clone(existing));
                Arc::clone(names)
            }
            None => {
                winner = Some(Arc::clone(&fresh));
                let mut next = (**names).clone();
                next.insert(name, Arc::clone(&fresh));
                Arc::new(next)
            }
        });
        winner.unwrap_or(fresh)
    }

    /// Encodes `value` into a fresh buffer
    pub fn serialize<T: Shaped>(&self, value: &T) -> Result<Vec<u8>, Fault> {
        let converter = self.converter::<T>()?;
        let mut sink = ByteSink::with_capacity(self.config.initial_sink_capacity);
        encode_value(&*converter, &mut sink, value)?;
        Ok(sink.finalize())
    }

    /// Decodes a `T` from the whole of `bytes`
    pub fn deserialize<T: Shaped>(&self, bytes: &[u8]) -> Result<T, Fault> {
        let converter = self.converter::<T>()?;
        decode_value(&*converter, DecodedBlock::new(bytes))
    }

    /// Late-bound accessor over an encoded buffer
    #[must_use]
    pub fn reader<'c, 'b>(&'c self, bytes: &'b [u8]) -> DynamicReader<'c, 'b> {
        DynamicReader::new(self, bytes)
    }
}

impl Default for PacketCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for PacketCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let table = self.converters.load();
        let mut shapes: Vec<&'static str> = table.values().map(|e| e.type_name).collect();
        shapes.sort_unstable();
        f.debug_struct("PacketCache")
            .field("config", &self.config)
            .field("shapes", &shapes)
            .finish()
    }
}

/// Startup-time configuration of a [`PacketCache`]
#[derive(Default)]
pub struct PacketCacheBuilder {
    config: CacheConfig,
    registered: Vec<(TypeId, Arc<Entry>)>,
}

impl PacketCacheBuilder {
    /// Registers `converter` for `T`, overriding any seed converter for `T`
    #[must_use]
    pub fn converter<T: 'static, C: Converter<T>>(mut self, converter: C) -> Self {
        let converter: ConverterRef<T> = Arc::new(converter);
        self.registered.push((
            TypeId::of::<T>(),
            Arc::new(Entry::new(Origin::Registered, converter)),
        ));
        self
    }

    #[must_use]
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_sink_capacity = capacity;
        self
    }

    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> PacketCache {
        let mut table = Table::with_capacity(SEEDS.len() + self.registered.len());
        for seed in SEEDS.iter() {
            table.insert(seed.type_id, Arc::new(Entry::from_seed(seed)));
        }
        for (type_id, entry) in self.registered {
            tracing::debug!(shape = entry.type_name, "explicit converter registration");
            table.insert(type_id, entry);
        }
        PacketCache {
            converters: ArcSwap::from_pointee(table),
            names: ArcSwap::from_pointee(HashMap::new()),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_threadsafe() {
        fn check<T: Send + Sync>() {}
        check::<PacketCache>();
    }

    #[test]
    fn seeds_are_present() {
        let cache = PacketCache::new();
        assert_eq!(cache.origin::<i32>(), Some(Origin::Seeded));
        assert_eq!(cache.fixed_width::<Decimal>(), Some(16));
        assert_eq!(cache.fixed_width::<String>(), None);
        assert!(cache.contains::<String>());
        assert!(!cache.contains::<Vec<u8>>());
    }

    #[test]
    fn interned_names_are_shared() {
        let cache = PacketCache::new();
        let a = cache.intern("field");
        let b = cache.intern("field");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, b"field");
    }

    #[test]
    fn registration_refused_after_use() {
        let cache = PacketCache::new();
        assert!(cache.register::<u8, _>(PrimitiveConverter::new()));
        assert_eq!(cache.origin::<u8>(), Some(Origin::Registered));
        assert!(cache.lookup::<u8>().is_some());
        assert!(!cache.register::<u8, _>(PrimitiveConverter::new()));
    }

    fn fresh_converter() -> ConverterRef<u8> {
        Arc::new(PrimitiveConverter::<u8>::new())
    }

    #[test]
    fn entry_leaves_fresh_once() {
        let claimed = Entry::new::<u8>(Origin::Seeded, fresh_converter());
        assert!(matches!(claimed.claim::<u8>(), Ok(Some(_))));
        assert!(!claimed.retire());
        assert!(matches!(claimed.claim::<u8>(), Ok(Some(_))));

        let retired = Entry::new::<u8>(Origin::Seeded, fresh_converter());
        assert!(retired.retire());
        assert!(retired.retire());
        assert!(matches!(retired.claim::<u8>(), Err(Retired)));
    }

    #[test]
    fn derived_once() {
        let cache = PacketCache::new();
        let first = cache.converter::<Vec<u32>>().unwrap();
        let second = cache.converter::<Vec<u32>>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.origin::<Vec<u32>>(), Some(Origin::Derived));
    }
}
