//! The in-memory keyspace and its command dispatch.

use std::collections::{HashMap, HashSet, VecDeque};

use kvguard_core::{Command, DriverError, Value};
use tokio::time::{Duration, Instant};

/// One typed entry in the keyspace.
enum Entry {
    Text(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(HashSet<String>),
    SortedSet(HashMap<String, f64>),
}

struct Stored {
    entry: Entry,
    expires_at: Option<Instant>,
}

/// A process-local keyspace with per-key expiry.
///
/// Expiry is lazy: an expired key is removed the next time anything
/// touches it, which is all the precision the tests need.
#[derive(Default)]
pub(crate) struct Store {
    entries: HashMap<String, Stored>,
}

fn arity(command: &Command, at_least: usize) -> Result<(), DriverError> {
    if command.args().len() < at_least {
        return Err(DriverError::Protocol(format!(
            "wrong number of arguments for {}",
            command.name()
        )));
    }
    Ok(())
}

fn parse_int(raw: &str) -> Result<i64, DriverError> {
    raw.parse::<i64>()
        .map_err(|_| DriverError::Protocol("value is not an integer".to_string()))
}

fn parse_float(raw: &str) -> Result<f64, DriverError> {
    raw.parse::<f64>()
        .map_err(|_| DriverError::Protocol("value is not a valid float".to_string()))
}

/// Resolves negative/overflowing range bounds the way list ranges do.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Minimal glob matching: `*` and `?` only, which covers the patterns
/// KEYS is used with here.
fn glob_match(pattern: &str, input: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let i: Vec<char> = input.chars().collect();

    fn matches(p: &[char], i: &[char]) -> bool {
        match (p.first(), i.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                matches(&p[1..], i) || (!i.is_empty() && matches(p, &i[1..]))
            }
            (Some('?'), Some(_)) => matches(&p[1..], &i[1..]),
            (Some(pc), Some(ic)) => pc == ic && matches(&p[1..], &i[1..]),
            _ => false,
        }
    }
    matches(&p, &i)
}

impl Store {
    /// Executes one command against the keyspace.
    pub(crate) fn dispatch(&mut self, command: &Command) -> Result<Value, DriverError> {
        match command.name() {
            "PING" => Ok(Value::Text("PONG".to_string())),

            // Strings and numerics
            "GET" => {
                arity(command, 1)?;
                match self.text(command, &command.args()[0])? {
                    Some(value) => Ok(Value::Text(value)),
                    None => Ok(Value::Nil),
                }
            }
            "SET" => {
                arity(command, 2)?;
                self.put_text(&command.args()[0], &command.args()[1], None);
                Ok(Value::Text("OK".to_string()))
            }
            "SETEX" => {
                arity(command, 3)?;
                let ttl = parse_int(&command.args()[1])?;
                self.put_text(
                    &command.args()[0],
                    &command.args()[2],
                    Some(Duration::from_secs(ttl.max(0) as u64)),
                );
                Ok(Value::Text("OK".to_string()))
            }
            "SETNX" => {
                arity(command, 2)?;
                if self.live(&command.args()[0]).is_some() {
                    Ok(Value::Integer(0))
                } else {
                    self.put_text(&command.args()[0], &command.args()[1], None);
                    Ok(Value::Integer(1))
                }
            }
            "MGET" => {
                arity(command, 1)?;
                let mut out = Vec::with_capacity(command.args().len());
                for key in command.args() {
                    out.push(match self.text(command, key)? {
                        Some(value) => Value::Text(value),
                        None => Value::Nil,
                    });
                }
                Ok(Value::Array(out))
            }
            "MSET" => {
                arity(command, 2)?;
                if command.args().len() % 2 != 0 {
                    return Err(DriverError::Protocol(
                        "wrong number of arguments for MSET".to_string(),
                    ));
                }
                for pair in command.args().chunks(2) {
                    self.put_text(&pair[0], &pair[1], None);
                }
                Ok(Value::Text("OK".to_string()))
            }
            "INCR" => self.add_to(command, 1),
            "DECR" => self.add_to(command, -1),
            "INCRBY" => {
                arity(command, 2)?;
                let delta = parse_int(&command.args()[1])?;
                self.add_to(command, delta)
            }
            "DECRBY" => {
                arity(command, 2)?;
                // i64::MIN has no negation.
                let delta = parse_int(&command.args()[1])?.checked_neg().ok_or_else(|| {
                    DriverError::Protocol("increment or decrement would overflow".to_string())
                })?;
                self.add_to(command, delta)
            }

            // Keys
            "DEL" => {
                arity(command, 1)?;
                let mut removed = 0;
                for key in command.args() {
                    if self.live(key).is_some() && self.entries.remove(key).is_some() {
                        removed += 1;
                    }
                }
                Ok(Value::Integer(removed))
            }
            "EXISTS" => {
                arity(command, 1)?;
                Ok(Value::Integer(i64::from(
                    self.live(&command.args()[0]).is_some(),
                )))
            }
            "EXPIRE" => {
                arity(command, 2)?;
                let ttl = parse_int(&command.args()[1])?;
                let key = command.args()[0].clone();
                if self.live(&key).is_some() {
                    if let Some(stored) = self.entries.get_mut(&key) {
                        stored.expires_at =
                            Some(Instant::now() + Duration::from_secs(ttl.max(0) as u64));
                    }
                    Ok(Value::Integer(1))
                } else {
                    Ok(Value::Integer(0))
                }
            }
            "TTL" => {
                arity(command, 1)?;
                let key = &command.args()[0];
                match self.live(key) {
                    None => Ok(Value::Integer(-2)),
                    Some(stored) => match stored.expires_at {
                        None => Ok(Value::Integer(-1)),
                        Some(at) => {
                            Ok(Value::Integer(at.saturating_duration_since(Instant::now())
                                .as_secs() as i64))
                        }
                    },
                }
            }
            "PERSIST" => {
                arity(command, 1)?;
                let key = command.args()[0].clone();
                match self.live(&key) {
                    Some(stored) if stored.expires_at.is_some() => {
                        if let Some(stored) = self.entries.get_mut(&key) {
                            stored.expires_at = None;
                        }
                        Ok(Value::Integer(1))
                    }
                    _ => Ok(Value::Integer(0)),
                }
            }
            "KEYS" => {
                arity(command, 1)?;
                let pattern = command.args()[0].clone();
                self.prune_expired();
                let mut keys: Vec<String> = self
                    .entries
                    .keys()
                    .filter(|key| glob_match(&pattern, key))
                    .cloned()
                    .collect();
                keys.sort();
                Ok(keys.into())
            }

            // Hashes
            "HGET" => {
                arity(command, 2)?;
                let hash = self.hash(command, &command.args()[0])?;
                Ok(hash
                    .and_then(|h| h.get(&command.args()[1]).cloned())
                    .map_or(Value::Nil, Value::Text))
            }
            "HSET" => {
                arity(command, 3)?;
                let (key, field, value) = (
                    command.args()[0].clone(),
                    command.args()[1].clone(),
                    command.args()[2].clone(),
                );
                let hash = self.hash_mut(command, &key)?;
                let added = i64::from(!hash.contains_key(&field));
                hash.insert(field, value);
                Ok(Value::Integer(added))
            }
            "HDEL" => {
                arity(command, 2)?;
                let key = command.args()[0].clone();
                let fields: Vec<String> = command.args()[1..].to_vec();
                let hash = self.hash_mut(command, &key)?;
                let mut removed = 0;
                for field in &fields {
                    if hash.remove(field).is_some() {
                        removed += 1;
                    }
                }
                Ok(Value::Integer(removed))
            }
            "HGETALL" => {
                arity(command, 1)?;
                match self.hash(command, &command.args()[0])? {
                    None => Ok(Value::Map(Vec::new())),
                    Some(hash) => {
                        let mut pairs: Vec<(String, Value)> = hash
                            .iter()
                            .map(|(field, value)| (field.clone(), Value::Text(value.clone())))
                            .collect();
                        pairs.sort_by(|a, b| a.0.cmp(&b.0));
                        Ok(Value::Map(pairs))
                    }
                }
            }
            "HEXISTS" => {
                arity(command, 2)?;
                let hash = self.hash(command, &command.args()[0])?;
                Ok(Value::Integer(i64::from(
                    hash.map(|h| h.contains_key(&command.args()[1]))
                        .unwrap_or(false),
                )))
            }
            "HLEN" => {
                arity(command, 1)?;
                let hash = self.hash(command, &command.args()[0])?;
                Ok(Value::Integer(hash.map(|h| h.len() as i64).unwrap_or(0)))
            }
            "HKEYS" => {
                arity(command, 1)?;
                let hash = self.hash(command, &command.args()[0])?;
                let mut keys: Vec<String> =
                    hash.map(|h| h.keys().cloned().collect()).unwrap_or_default();
                keys.sort();
                Ok(keys.into())
            }
            "HVALS" => {
                arity(command, 1)?;
                match self.hash(command, &command.args()[0])? {
                    None => Ok(Value::Array(Vec::new())),
                    Some(hash) => {
                        let mut pairs: Vec<(&String, &String)> = hash.iter().collect();
                        pairs.sort_by(|a, b| a.0.cmp(b.0));
                        Ok(pairs
                            .into_iter()
                            .map(|(_, v)| v.clone())
                            .collect::<Vec<_>>()
                            .into())
                    }
                }
            }

            // Lists
            "LPUSH" | "RPUSH" => {
                arity(command, 2)?;
                let key = command.args()[0].clone();
                let values: Vec<String> = command.args()[1..].to_vec();
                let front = command.name() == "LPUSH";
                let list = self.list_mut(command, &key)?;
                for value in values {
                    if front {
                        list.push_front(value);
                    } else {
                        list.push_back(value);
                    }
                }
                Ok(Value::Integer(list.len() as i64))
            }
            "LPOP" | "RPOP" => {
                arity(command, 1)?;
                let key = command.args()[0].clone();
                let front = command.name() == "LPOP";
                let list = self.list_mut(command, &key)?;
                let popped = if front { list.pop_front() } else { list.pop_back() };
                Ok(popped.map_or(Value::Nil, Value::Text))
            }
            "LLEN" => {
                arity(command, 1)?;
                let len = match self.live(&command.args()[0]) {
                    None => 0,
                    Some(stored) => match &stored.entry {
                        Entry::List(list) => list.len() as i64,
                        _ => {
                            return Err(DriverError::WrongType {
                                command: command.name().to_string(),
                            })
                        }
                    },
                };
                Ok(Value::Integer(len))
            }
            "LRANGE" => {
                arity(command, 3)?;
                let start = parse_int(&command.args()[1])?;
                let stop = parse_int(&command.args()[2])?;
                let items = match self.live(&command.args()[0]) {
                    None => Vec::new(),
                    Some(stored) => match &stored.entry {
                        Entry::List(list) => match resolve_range(list.len(), start, stop) {
                            None => Vec::new(),
                            Some((from, to)) => {
                                list.iter().skip(from).take(to - from + 1).cloned().collect()
                            }
                        },
                        _ => {
                            return Err(DriverError::WrongType {
                                command: command.name().to_string(),
                            })
                        }
                    },
                };
                Ok(items.into())
            }

            // Sets
            "SADD" => {
                arity(command, 2)?;
                let key = command.args()[0].clone();
                let members: Vec<String> = command.args()[1..].to_vec();
                let set = self.set_mut(command, &key)?;
                let mut added = 0;
                for member in members {
                    if set.insert(member) {
                        added += 1;
                    }
                }
                Ok(Value::Integer(added))
            }
            "SREM" => {
                arity(command, 2)?;
                let key = command.args()[0].clone();
                let members: Vec<String> = command.args()[1..].to_vec();
                let set = self.set_mut(command, &key)?;
                let mut removed = 0;
                for member in &members {
                    if set.remove(member) {
                        removed += 1;
                    }
                }
                Ok(Value::Integer(removed))
            }
            "SMEMBERS" => {
                arity(command, 1)?;
                let mut members = match self.set(command, &command.args()[0])? {
                    None => Vec::new(),
                    Some(set) => set.iter().cloned().collect::<Vec<_>>(),
                };
                members.sort();
                Ok(members.into())
            }
            "SISMEMBER" => {
                arity(command, 2)?;
                let set = self.set(command, &command.args()[0])?;
                Ok(Value::Integer(i64::from(
                    set.map(|s| s.contains(&command.args()[1])).unwrap_or(false),
                )))
            }
            "SCARD" => {
                arity(command, 1)?;
                let set = self.set(command, &command.args()[0])?;
                Ok(Value::Integer(set.map(|s| s.len() as i64).unwrap_or(0)))
            }

            // Sorted sets
            "ZADD" => {
                arity(command, 3)?;
                let key = command.args()[0].clone();
                let score = parse_float(&command.args()[1])?;
                let member = command.args()[2].clone();
                let zset = self.zset_mut(command, &key)?;
                let added = i64::from(!zset.contains_key(&member));
                zset.insert(member, score);
                Ok(Value::Integer(added))
            }
            "ZREM" => {
                arity(command, 2)?;
                let key = command.args()[0].clone();
                let members: Vec<String> = command.args()[1..].to_vec();
                let zset = self.zset_mut(command, &key)?;
                let mut removed = 0;
                for member in &members {
                    if zset.remove(member).is_some() {
                        removed += 1;
                    }
                }
                Ok(Value::Integer(removed))
            }
            "ZSCORE" => {
                arity(command, 2)?;
                let zset = self.zset(command, &command.args()[0])?;
                Ok(zset
                    .and_then(|z| z.get(&command.args()[1]).copied())
                    .map_or(Value::Nil, Value::Double))
            }
            "ZCARD" => {
                arity(command, 1)?;
                let zset = self.zset(command, &command.args()[0])?;
                Ok(Value::Integer(zset.map(|z| z.len() as i64).unwrap_or(0)))
            }
            "ZRANGE" => {
                arity(command, 3)?;
                let start = parse_int(&command.args()[1])?;
                let stop = parse_int(&command.args()[2])?;
                let ranked = match self.zset(command, &command.args()[0])? {
                    None => Vec::new(),
                    Some(zset) => {
                        let mut ranked: Vec<(&String, &f64)> = zset.iter().collect();
                        ranked.sort_by(|a, b| {
                            a.1.partial_cmp(b.1)
                                .unwrap_or(std::cmp::Ordering::Equal)
                                .then_with(|| a.0.cmp(b.0))
                        });
                        match resolve_range(ranked.len(), start, stop) {
                            None => Vec::new(),
                            Some((from, to)) => ranked[from..=to]
                                .iter()
                                .map(|(member, _)| (*member).clone())
                                .collect(),
                        }
                    }
                };
                Ok(ranked.into())
            }

            // Pub/sub: no subscribers exist in a process-local driver.
            "PUBLISH" => {
                arity(command, 2)?;
                Ok(Value::Integer(0))
            }

            "EVAL" => Err(DriverError::Unsupported("EVAL".to_string())),

            other => Err(DriverError::Unsupported(other.to_string())),
        }
    }

    fn prune_expired(&mut self) {
        let now = Instant::now();
        self.entries
            .retain(|_, stored| stored.expires_at.map(|at| at > now).unwrap_or(true));
    }

    /// The entry under `key` if present and not expired; expired entries
    /// are removed as a side effect.
    fn live(&mut self, key: &str) -> Option<&Stored> {
        let expired = self
            .entries
            .get(key)
            .and_then(|stored| stored.expires_at)
            .map(|at| at <= Instant::now())
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
        }
        self.entries.get(key)
    }

    fn put_text(&mut self, key: &str, value: &str, ttl: Option<Duration>) {
        self.entries.insert(
            key.to_string(),
            Stored {
                entry: Entry::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    fn text(&mut self, command: &Command, key: &str) -> Result<Option<String>, DriverError> {
        match self.live(key) {
            None => Ok(None),
            Some(stored) => match &stored.entry {
                Entry::Text(value) => Ok(Some(value.clone())),
                _ => Err(DriverError::WrongType {
                    command: command.name().to_string(),
                }),
            },
        }
    }

    fn add_to(&mut self, command: &Command, delta: i64) -> Result<Value, DriverError> {
        arity(command, 1)?;
        let key = command.args()[0].clone();
        let current = match self.text(command, &key)? {
            Some(raw) => parse_int(&raw)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or_else(|| {
            DriverError::Protocol("increment or decrement would overflow".to_string())
        })?;
        // Preserve any expiry already on the key.
        let expires_at = self.entries.get(&key).and_then(|stored| stored.expires_at);
        self.entries.insert(
            key,
            Stored {
                entry: Entry::Text(next.to_string()),
                expires_at,
            },
        );
        Ok(Value::Integer(next))
    }

    fn hash(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<Option<&HashMap<String, String>>, DriverError> {
        match self.live(key) {
            None => Ok(None),
            Some(stored) => match &stored.entry {
                Entry::Hash(hash) => Ok(Some(hash)),
                _ => Err(DriverError::WrongType {
                    command: command.name().to_string(),
                }),
            },
        }
    }

    fn hash_mut(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<&mut HashMap<String, String>, DriverError> {
        self.typed_mut(command, key, || Entry::Hash(HashMap::new()), |entry| {
            match entry {
                Entry::Hash(hash) => Some(hash),
                _ => None,
            }
        })
    }

    fn list_mut(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<&mut VecDeque<String>, DriverError> {
        self.typed_mut(command, key, || Entry::List(VecDeque::new()), |entry| {
            match entry {
                Entry::List(list) => Some(list),
                _ => None,
            }
        })
    }

    fn set(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<Option<&HashSet<String>>, DriverError> {
        match self.live(key) {
            None => Ok(None),
            Some(stored) => match &stored.entry {
                Entry::Set(set) => Ok(Some(set)),
                _ => Err(DriverError::WrongType {
                    command: command.name().to_string(),
                }),
            },
        }
    }

    fn set_mut(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<&mut HashSet<String>, DriverError> {
        self.typed_mut(command, key, || Entry::Set(HashSet::new()), |entry| {
            match entry {
                Entry::Set(set) => Some(set),
                _ => None,
            }
        })
    }

    fn zset(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<Option<&HashMap<String, f64>>, DriverError> {
        match self.live(key) {
            None => Ok(None),
            Some(stored) => match &stored.entry {
                Entry::SortedSet(zset) => Ok(Some(zset)),
                _ => Err(DriverError::WrongType {
                    command: command.name().to_string(),
                }),
            },
        }
    }

    fn zset_mut(
        &mut self,
        command: &Command,
        key: &str,
    ) -> Result<&mut HashMap<String, f64>, DriverError> {
        self.typed_mut(command, key, || Entry::SortedSet(HashMap::new()), |entry| {
            match entry {
                Entry::SortedSet(zset) => Some(zset),
                _ => None,
            }
        })
    }

    /// Fetches the entry under `key` as the requested type, creating it
    /// when absent, failing with `WrongType` when it holds another type.
    fn typed_mut<T>(
        &mut self,
        command: &Command,
        key: &str,
        create: impl FnOnce() -> Entry,
        project: impl FnOnce(&mut Entry) -> Option<&mut T>,
    ) -> Result<&mut T, DriverError> {
        self.live(key);
        let stored = self.entries.entry(key.to_string()).or_insert_with(|| Stored {
            entry: create(),
            expires_at: None,
        });
        project(&mut stored.entry).ok_or_else(|| DriverError::WrongType {
            command: command.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(store: &mut Store, command: Command) -> Result<Value, DriverError> {
        store.dispatch(&command)
    }

    #[test]
    fn set_then_get() {
        let mut store = Store::default();
        run(&mut store, Command::new("SET").arg("k").arg("v")).unwrap();
        assert_eq!(
            run(&mut store, Command::new("GET").arg("k")).unwrap(),
            Value::Text("v".to_string())
        );
    }

    #[test]
    fn get_missing_is_nil() {
        let mut store = Store::default();
        assert_eq!(
            run(&mut store, Command::new("GET").arg("nope")).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn incr_starts_from_zero() {
        let mut store = Store::default();
        assert_eq!(
            run(&mut store, Command::new("INCR").arg("n")).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            run(&mut store, Command::new("INCRBY").arg("n").arg(9)).unwrap(),
            Value::Integer(10)
        );
        assert_eq!(
            run(&mut store, Command::new("DECR").arg("n")).unwrap(),
            Value::Integer(9)
        );
    }

    #[test]
    fn incr_at_the_integer_limits_is_a_protocol_error() {
        let mut store = Store::default();
        run(&mut store, Command::new("SET").arg("n").arg(i64::MAX)).unwrap();
        let err = run(&mut store, Command::new("INCR").arg("n")).unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
        // The stored value is untouched.
        assert_eq!(
            run(&mut store, Command::new("GET").arg("n")).unwrap(),
            Value::Text(i64::MAX.to_string())
        );

        run(&mut store, Command::new("SET").arg("n").arg(i64::MIN)).unwrap();
        let err = run(&mut store, Command::new("DECR").arg("n")).unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[test]
    fn incr_on_text_is_a_protocol_error() {
        let mut store = Store::default();
        run(&mut store, Command::new("SET").arg("k").arg("abc")).unwrap();
        let err = run(&mut store, Command::new("INCR").arg("k")).unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[test]
    fn wrong_type_is_surfaced() {
        let mut store = Store::default();
        run(&mut store, Command::new("LPUSH").arg("l").arg("x")).unwrap();
        let err = run(&mut store, Command::new("GET").arg("l")).unwrap_err();
        assert!(matches!(err, DriverError::WrongType { .. }));
    }

    #[test]
    fn hash_round_trip() {
        let mut store = Store::default();
        assert_eq!(
            run(&mut store, Command::new("HSET").arg("h").arg("f").arg("1")).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            run(&mut store, Command::new("HSET").arg("h").arg("f").arg("2")).unwrap(),
            Value::Integer(0),
            "overwriting an existing field adds nothing"
        );
        assert_eq!(
            run(&mut store, Command::new("HGET").arg("h").arg("f")).unwrap(),
            Value::Text("2".to_string())
        );
        assert_eq!(
            run(&mut store, Command::new("HGETALL").arg("h")).unwrap(),
            Value::Map(vec![("f".to_string(), Value::Text("2".to_string()))])
        );
    }

    #[test]
    fn list_ranges_support_negative_indices() {
        let mut store = Store::default();
        run(
            &mut store,
            Command::new("RPUSH").arg("l").args_from(["a", "b", "c", "d"]),
        )
        .unwrap();
        assert_eq!(
            run(&mut store, Command::new("LRANGE").arg("l").arg(0).arg(-1)).unwrap(),
            vec!["a".to_string(), "b".into(), "c".into(), "d".into()].into()
        );
        assert_eq!(
            run(&mut store, Command::new("LRANGE").arg("l").arg(-2).arg(-1)).unwrap(),
            vec!["c".to_string(), "d".into()].into()
        );
    }

    #[test]
    fn zrange_orders_by_score_then_member() {
        let mut store = Store::default();
        for (score, member) in [(2.0, "b"), (1.0, "a"), (2.0, "aa")] {
            run(
                &mut store,
                Command::new("ZADD").arg("z").arg(score).arg(member),
            )
            .unwrap();
        }
        assert_eq!(
            run(&mut store, Command::new("ZRANGE").arg("z").arg(0).arg(-1)).unwrap(),
            vec!["a".to_string(), "aa".into(), "b".into()].into()
        );
    }

    #[test]
    fn ttl_bookkeeping() {
        let mut store = Store::default();
        run(&mut store, Command::new("SET").arg("k").arg("v")).unwrap();
        assert_eq!(
            run(&mut store, Command::new("TTL").arg("k")).unwrap(),
            Value::Integer(-1)
        );
        run(&mut store, Command::new("EXPIRE").arg("k").arg(100)).unwrap();
        match run(&mut store, Command::new("TTL").arg("k")).unwrap() {
            Value::Integer(ttl) => assert!(ttl > 90),
            other => panic!("unexpected reply {:?}", other),
        }
        run(&mut store, Command::new("PERSIST").arg("k")).unwrap();
        assert_eq!(
            run(&mut store, Command::new("TTL").arg("k")).unwrap(),
            Value::Integer(-1)
        );
        assert_eq!(
            run(&mut store, Command::new("TTL").arg("missing")).unwrap(),
            Value::Integer(-2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_vanish() {
        let mut store = Store::default();
        run(
            &mut store,
            Command::new("SETEX").arg("k").arg(1).arg("v"),
        )
        .unwrap();
        assert_eq!(
            run(&mut store, Command::new("EXISTS").arg("k")).unwrap(),
            Value::Integer(1)
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            run(&mut store, Command::new("GET").arg("k")).unwrap(),
            Value::Nil
        );
        assert_eq!(
            run(&mut store, Command::new("EXISTS").arg("k")).unwrap(),
            Value::Integer(0)
        );
    }

    #[test]
    fn keys_glob_matching() {
        let mut store = Store::default();
        for key in ["user:1", "user:2", "session:1"] {
            run(&mut store, Command::new("SET").arg(key).arg("x")).unwrap();
        }
        assert_eq!(
            run(&mut store, Command::new("KEYS").arg("user:*")).unwrap(),
            vec!["user:1".to_string(), "user:2".into()].into()
        );
        assert_eq!(
            run(&mut store, Command::new("KEYS").arg("*")).unwrap(),
            vec!["session:1".to_string(), "user:1".into(), "user:2".into()].into()
        );
    }

    #[test]
    fn unknown_commands_are_unsupported() {
        let mut store = Store::default();
        let err = run(&mut store, Command::new("OBJECT").arg("k")).unwrap_err();
        assert!(matches!(err, DriverError::Unsupported(_)));
    }
}
