//! # Event Bus Module
//!
//! Provides a unified event bus system for decoupled communication between
//! the processor, task contexts, and external observers.
//!
//! ## Overview
//!
//! The event bus enables publish/subscribe patterns across the application:
//! - Publishers emit typed events without knowing subscribers
//! - Subscribers filter and receive events of interest
//! - Supports both sync and async event handling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskctl_core::event_bus::{event_bus, AppEvent, ProgramEvent, EventFilter, EventCategory};
//!
//! // Subscribe to program events
//! let subscription = event_bus().subscribe(
//!     EventFilter::Categories(vec![EventCategory::Program]),
//!     |event| {
//!         if let AppEvent::Program(prog) = event {
//!             println!("Program event: {:?}", prog);
//!         }
//!     },
//! );
//!
//! // Publish an event
//! event_bus().publish(AppEvent::Program(ProgramEvent::Started {
//!     name: "main".to_string(),
//! }));
//!
//! // Unsubscribe when done
//! event_bus().unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
