//! Simulated PSU used by unit tests in place of real interrupt endpoints.

use crate::hid::{opcodes, pages, Endpoints, Frame, HidError, Rail, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

/// Where the simulated device should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Answer the next request with a wrong echoed opcode.
    Mismatch,
    /// Fail the next outbound transfer.
    WriteError,
    /// Fail the next inbound transfer.
    ReadError,
}

/// Parks one write until the test releases it.
pub struct Gate {
    pub entered: Barrier,
    pub release: Barrier,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }
}

#[derive(Default)]
pub struct PsuState {
    /// Payloads for rail-independent opcodes.
    registers: HashMap<u8, Vec<u8>>,
    /// Payloads for per-rail opcodes.
    rail_registers: HashMap<(Rail, u8), Vec<u8>>,
    /// Currently selected rail index, if any.
    pub selected_rail: Option<u8>,
    /// Every command frame written, in order.
    pub written: Vec<Frame>,
    faults: VecDeque<Fault>,
    pending: Option<Frame>,
    /// Gate and the number of earlier writes to let through before it.
    gate: Option<(usize, Arc<Gate>)>,
}

impl PsuState {
    fn respond(&mut self, command: &Frame) -> Frame {
        let mut response = Frame::zeroed();
        let bytes = response.as_mut_bytes();
        bytes[1] = command.opcode();

        if self.faults.front() == Some(&Fault::Mismatch) {
            self.faults.pop_front();
            bytes[1] = !command.opcode();
            return response;
        }

        let payload = match command.page() {
            pages::RAIL_SELECT if command.opcode() == opcodes::RAIL_SELECT => {
                self.selected_rail = Some(command.operand());
                Some(vec![command.operand()])
            }
            pages::IDENTIFY => self.registers.get(&command.opcode()).cloned(),
            _ => {
                let rail = match self.selected_rail {
                    Some(0) => Some(Rail::V12),
                    Some(1) => Some(Rail::V5),
                    Some(2) => Some(Rail::V3_3),
                    _ => None,
                };
                rail.and_then(|r| self.rail_registers.get(&(r, command.opcode())))
                    .or_else(|| self.registers.get(&command.opcode()))
                    .cloned()
            }
        };

        match payload {
            Some(data) => response.payload_mut()[..data.len()].copy_from_slice(&data),
            // Unknown opcodes come back as an error response
            None => response.as_mut_bytes()[1] = !command.opcode(),
        }
        response
    }
}

/// Endpoint pair backed by an in-memory PSU model.
#[derive(Clone, Default)]
pub struct MockPsu {
    state: Arc<Mutex<PsuState>>,
}

impl MockPsu {
    pub fn new() -> Self {
        let psu = Self::default();
        psu.set_register(opcodes::IDENTIFY, b"RM650i\0");
        psu.set_register(opcodes::MFR_ID, b"CORSAIR\0");
        psu.set_register(opcodes::MFR_MODEL, b"RM650i\0");
        psu
    }

    pub fn set_register(&self, opcode: u8, payload: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert(opcode, payload.to_vec());
    }

    pub fn set_linear11(&self, opcode: u8, word: u16) {
        self.set_register(opcode, &word.to_le_bytes());
    }

    pub fn set_u32(&self, opcode: u8, value: u32) {
        self.set_register(opcode, &value.to_le_bytes());
    }

    pub fn set_rail_linear11(&self, rail: Rail, opcode: u8, word: u16) {
        self.state
            .lock()
            .unwrap()
            .rail_registers
            .insert((rail, opcode), word.to_le_bytes().to_vec());
    }

    pub fn remove_register(&self, opcode: u8) {
        self.state.lock().unwrap().registers.remove(&opcode);
    }

    pub fn push_fault(&self, fault: Fault) {
        self.state.lock().unwrap().faults.push_back(fault);
    }

    /// Park the next write.
    pub fn set_gate(&self, gate: Arc<Gate>) {
        self.set_gate_at(0, gate);
    }

    /// Park the write made after `writes` frames have been written.
    pub fn set_gate_at(&self, writes: usize, gate: Arc<Gate>) {
        self.state.lock().unwrap().gate = Some((writes, gate));
    }

    /// (page, opcode, operand) of every frame written so far.
    pub fn written(&self) -> Vec<(u8, u8, u8)> {
        self.state
            .lock()
            .unwrap()
            .written
            .iter()
            .map(|f| (f.page(), f.opcode(), f.operand()))
            .collect()
    }

    pub fn clear_written(&self) {
        self.state.lock().unwrap().written.clear();
    }
}

impl Endpoints for MockPsu {
    fn write_frame(&mut self, frame: &Frame, _timeout: Duration) -> Result<()> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            match state.gate {
                Some((at, _)) if state.written.len() >= at => state.gate.take(),
                _ => None,
            }
        };
        if let Some((_, gate)) = gate {
            gate.entered.wait();
            gate.release.wait();
        }

        let mut state = self.state.lock().unwrap();
        if state.faults.front() == Some(&Fault::WriteError) {
            state.faults.pop_front();
            return Err(HidError::Timeout(Duration::from_millis(1000)));
        }

        state.written.push(*frame);
        let response = state.respond(frame);
        state.pending = Some(response);
        Ok(())
    }

    fn read_frame(&mut self, frame: &mut Frame, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.faults.front() == Some(&Fault::ReadError) {
            state.faults.pop_front();
            state.pending = None;
            return Err(HidError::Disconnected);
        }

        let response = state.pending.take().ok_or(HidError::Disconnected)?;
        frame.load(response.as_bytes());
        Ok(())
    }
}
