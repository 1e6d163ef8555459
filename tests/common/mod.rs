//! Scripted renderer that records every session it hands out

#![allow(dead_code)]

use pageshot::{
    Error, ImageFormat, NavigateOptions, RenderSession, Renderer, Result, SessionOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// JPEG SOI marker followed by a few bytes
pub const FAKE_JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    FailLaunch,
    TimeOut,
    FailNavigate,
    FailCapture,
    PanicOnCapture,
}

#[derive(Debug, Default)]
pub struct Tally {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub sessions: Mutex<Vec<SessionOptions>>,
    pub navigations: Mutex<Vec<(String, NavigateOptions)>>,
    pub captures: Mutex<Vec<(ImageFormat, Option<u8>)>>,
}

impl Tally {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeRenderer {
    pub script: Script,
    pub tally: Arc<Tally>,
}

impl FakeRenderer {
    pub fn new(script: Script) -> Self {
        Self { script, tally: Arc::new(Tally::default()) }
    }
}

pub struct FakeSession {
    script: Script,
    tally: Arc<Tally>,
}

impl Renderer for FakeRenderer {
    type Session = FakeSession;

    fn launch(&self, options: &SessionOptions) -> Result<FakeSession> {
        if self.script == Script::FailLaunch {
            return Err(Error::Initialization("no browser binary".into()));
        }
        self.tally.launched.fetch_add(1, Ordering::SeqCst);
        self.tally.sessions.lock().unwrap().push(*options);
        Ok(FakeSession { script: self.script, tally: self.tally.clone() })
    }
}

impl RenderSession for FakeSession {
    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()> {
        self.tally.navigations.lock().unwrap().push((url.to_string(), *options));
        match self.script {
            Script::TimeOut => Err(Error::Timeout(options.timeout.as_millis() as u64)),
            Script::FailNavigate => Err(Error::Load("net::ERR_NAME_NOT_RESOLVED".into())),
            _ => Ok(()),
        }
    }

    fn capture(&mut self, format: ImageFormat, quality: Option<u8>) -> Result<Vec<u8>> {
        self.tally.captures.lock().unwrap().push((format, quality));
        match self.script {
            Script::FailCapture => Err(Error::Render("target crashed".into())),
            Script::PanicOnCapture => panic!("renderer blew up"),
            _ => Ok(FAKE_JPEG.to_vec()),
        }
    }

    fn close(self) -> Result<()> {
        self.tally.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
