use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AppError;

/// 2024-01-01T00:00:00Z in unix milliseconds.
const EPOCH_MS: i64 = 1_704_067_200_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake-style 64-bit identifier source.
///
/// Layout: 41 bits of milliseconds since [`EPOCH_MS`], 10 bits of node id,
/// 12 bits of per-millisecond sequence. Ids from one generator are strictly
/// increasing; ids from generators with distinct node ids never collide.
pub struct IdGenerator {
    node_id: i64,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    last_ms: i64,
    sequence: i64,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Result<Self, AppError> {
        if node_id > MAX_NODE {
            return Err(AppError::System(format!(
                "id node must be at most {MAX_NODE}, got {node_id}"
            )));
        }
        Ok(Self {
            node_id: i64::from(node_id),
            state: Mutex::new(State::default()),
        })
    }

    pub fn next_id(&self) -> Result<i64, AppError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::System("id generator lock poisoned".into()))?;

        let mut now = current_ms()?;
        if now < state.last_ms {
            return Err(AppError::System(format!(
                "clock moved backwards by {}ms",
                state.last_ms - now
            )));
        }

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = current_ms()?;
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        Ok(((now - EPOCH_MS) << (NODE_BITS + SEQUENCE_BITS))
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence)
    }
}

fn current_ms() -> Result<i64, AppError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::System(format!("system clock before unix epoch: {e}")))?;
    i64::try_from(elapsed.as_millis())
        .map_err(|_| AppError::System("system clock out of range".into()))
}
