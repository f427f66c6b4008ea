//! Discord integration - chat interface for encore
//!
//! This crate provides the chat-facing surface:
//! - **Commands** (`commands`) - `!concerts add/list/files`, `!artists`,
//!   `!games`, routed through service traits
//! - **Messenger** (`messenger`) - outbound delivery port; every digest chunk
//!   is one message
//! - **Gateway** (`gateway`) - inbound message pump with reconnection logic
//!
//! # Architecture
//!
//! ```text
//! Gateway messages → parse_command → CommandRouter → Services → CommandReply
//!                                                        ↓
//!                                         Messenger ← chunked text
//! ```
//!
//! The wire protocol stays behind the `GatewayTransport` and `Messenger`
//! traits; this crate never talks to Discord directly.

pub mod commands;
pub mod gateway;
pub mod messenger;
