//! Recording resource backends for driving sessions without a GPU.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::marker::PhantomData;
use std::rc::Rc;

use unray::{
    ArrayTextureSpec, Channel, InstanceBufferSpec, LutTextureSpec, Method, PartialEncoding,
    PlotData, ResourceBackend, ResourceManagers, Session, SessionOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Created(usize),
    Updated(usize),
    Evicted(usize),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// A fake GPU resource remembering its content.
#[derive(Debug)]
pub struct Recorded<S> {
    pub serial: usize,
    pub spec: S,
}

pub struct RecordingBackend<S> {
    events: EventLog,
    next_serial: usize,
    /// Specs this backend can hold; others fail validation.
    pub accepts: fn(&S) -> bool,
    _spec: PhantomData<S>,
}

impl<S> RecordingBackend<S> {
    pub fn new() -> (Self, EventLog) {
        let events = EventLog::default();
        (
            Self {
                events: Rc::clone(&events),
                next_serial: 0,
                accepts: |_| true,
                _spec: PhantomData,
            },
            events,
        )
    }
}

impl<S: Clone> ResourceBackend for RecordingBackend<S> {
    type Spec = S;
    type Resource = Recorded<S>;
    type Error = io::Error;

    fn validate(&self, spec: &S) -> io::Result<()> {
        if (self.accepts)(spec) {
            Ok(())
        } else {
            Err(io::Error::other("resource exceeds backend limits"))
        }
    }

    fn create(&mut self, spec: &S) -> io::Result<Recorded<S>> {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.events.borrow_mut().push(Event::Created(serial));
        Ok(Recorded {
            serial,
            spec: spec.clone(),
        })
    }

    fn update(&mut self, resource: &mut Recorded<S>, spec: &S) -> io::Result<()> {
        self.events.borrow_mut().push(Event::Updated(resource.serial));
        resource.spec = spec.clone();
        Ok(())
    }

    fn evict(&mut self, resource: Recorded<S>) {
        self.events.borrow_mut().push(Event::Evicted(resource.serial));
    }
}

pub type TestSession = Session<
    RecordingBackend<ArrayTextureSpec>,
    RecordingBackend<LutTextureSpec>,
    RecordingBackend<InstanceBufferSpec>,
>;

/// Event logs of the three pools of a session.
pub struct Logs {
    pub arrays: EventLog,
    pub luts: EventLog,
    pub buffers: EventLog,
}

pub fn count(log: &EventLog, pred: fn(&Event) -> bool) -> usize {
    log.borrow().iter().filter(|e| pred(e)).count()
}

pub fn created(log: &EventLog) -> usize {
    count(log, |e| matches!(e, Event::Created(_)))
}

pub fn evicted(log: &EventLog) -> usize {
    count(log, |e| matches!(e, Event::Evicted(_)))
}

pub fn session_with(method: Method, options: SessionOptions) -> (TestSession, Logs) {
    let (arrays, array_log) = RecordingBackend::new();
    let (luts, lut_log) = RecordingBackend::new();
    let (buffers, buffer_log) = RecordingBackend::new();
    let session = Session::with_options(
        method,
        ResourceManagers::new(arrays, luts, buffers),
        options,
    );
    (
        session,
        Logs {
            arrays: array_log,
            luts: lut_log,
            buffers: buffer_log,
        },
    )
}

pub fn session(method: Method) -> (TestSession, Logs) {
    session_with(method, SessionOptions::default())
}

/// Two tetrahedra sharing the face (0, 1, 2); the first is inverted.
pub fn two_cells() -> PlotData {
    PlotData::new()
        .with("cells", vec![0i32, 1, 2, 3, 0, 1, 2, 4])
        .with(
            "points",
            vec![
                0.0f32, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0,
            ],
        )
}

pub fn mesh_encoding() -> PartialEncoding {
    PartialEncoding::new()
        .with_field(Channel::Cells, "cells")
        .with_field(Channel::Coordinates, "points")
}
