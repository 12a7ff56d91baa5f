//! Do some preparations for integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, LazyLock, Once, RwLock};

use carousel::{Remote, RemoteError};

pub static CAPTURED: LazyLock<Arc<RwLock<String>>> =
    LazyLock::new(|| Arc::new(RwLock::new(String::new())));
static INIT: Once = Once::new();

struct Capturer {
    content: Arc<RwLock<String>>,
}
impl std::io::Write for Capturer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut locked = self.content.write().unwrap();
        locked.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn setup() {
    INIT.call_once(|| {
        let cap = Capturer {
            content: CAPTURED.clone(),
        };
        env_logger::builder()
            .is_test(true)
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .filter_level(log::LevelFilter::Debug)
            .target(env_logger::Target::Pipe(Box::new(cap)))
            .init();
    });
}

pub fn captured() -> String {
    CAPTURED.read().expect("Cannot read captured log").to_string()
}

/// A [`Remote`] serving bodies from memory and remembering what was asked.
#[derive(Default)]
pub struct MemRemote {
    bodies: HashMap<String, Vec<u8>>,
    pub requested: RefCell<Vec<String>>,
}

impl MemRemote {
    pub fn serve(&mut self, url: &str, body: impl Into<Vec<u8>>) -> &mut Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requested
            .borrow()
            .iter()
            .filter(|requested| *requested == url)
            .count()
    }
}

impl Remote for MemRemote {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, RemoteError> {
        self.requested.borrow_mut().push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(RemoteError::Status(404)),
        }
    }
}
