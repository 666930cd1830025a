//! Application layer - use-case handlers orchestrating ports.

pub mod stream_turn;

pub use stream_turn::{
    ProviderResolver, StartedTurn, StreamTurnCommand, StreamTurnError, StreamTurnHandler,
    TurnConfig, TurnEvent, TurnEventStream,
};
