use std::{any::TypeId, collections::HashMap};

use log::{debug, warn};

use crate::{
    messages::{
        error::{HandlerError, RegistrationError},
        message::Message,
        message_kinds::MessageKinds,
    },
    types::PeerId,
};

/// A handler receives the full packet, tag byte included.
pub type Handler<C> = Box<dyn FnMut(&mut C, PeerId, &[u8]) -> Result<(), HandlerError>>;

struct HandlerEntry<C> {
    name: &'static str,
    handler: Handler<C>,
}

/// What happened to one inbound packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every handler for the tag ran; `failures` of them returned an error
    Delivered { handlers: usize, failures: usize },
    /// No handler is registered for the tag; the packet was dropped
    UnknownTag { tag: u8 },
    /// The packet had no tag byte
    Empty,
}

/// Demultiplexes inbound packets by their leading tag byte.
///
/// Several handlers may share a tag, each under its own name. A failing
/// handler is logged and does not prevent the remaining handlers from running.
/// `C` is the context every handler is given mutable access to.
pub struct MessageDispatcher<C> {
    message_kinds: MessageKinds,
    handlers: HashMap<u8, Vec<HandlerEntry<C>>>,
    typed_handlers: HashMap<TypeId, (u8, &'static str)>,
}

impl<C> MessageDispatcher<C> {
    pub fn new(message_kinds: MessageKinds) -> Self {
        Self {
            message_kinds,
            handlers: HashMap::new(),
            typed_handlers: HashMap::new(),
        }
    }

    /// Register a raw handler for `tag`
    ///
    /// # Panics
    ///
    /// Panics if a handler named `name` is already registered for `tag`.
    /// Consider using `try_register` for non-panicking error handling.
    pub fn register<F>(&mut self, tag: u8, name: &'static str, handler: F)
    where
        F: FnMut(&mut C, PeerId, &[u8]) -> Result<(), HandlerError> + 'static,
    {
        if let Err(error) = self.try_register(tag, name, handler) {
            panic!("{}", error);
        }
    }

    /// Register a raw handler for `tag`
    ///
    /// Returns an error if a handler named `name` is already registered for `tag`.
    pub fn try_register<F>(
        &mut self,
        tag: u8,
        name: &'static str,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: FnMut(&mut C, PeerId, &[u8]) -> Result<(), HandlerError> + 'static,
    {
        let entries = self.handlers.entry(tag).or_default();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(RegistrationError::DuplicateHandler { tag, name });
        }
        entries.push(HandlerEntry {
            name,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Removes the handler named `name` from `tag`. Returns whether one was removed.
    pub fn unregister(&mut self, tag: u8, name: &'static str) -> bool {
        let Some(entries) = self.handlers.get_mut(&tag) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.handlers.remove(&tag);
        }
        if removed {
            self.typed_handlers
                .retain(|_, (typed_tag, typed_name)| !(*typed_tag == tag && *typed_name == name));
        }
        removed
    }

    /// Register a handler for a structured message.
    ///
    /// The handler is wrapped in a raw handler that deserializes the packet
    /// first; a packet that fails to deserialize is reported as
    /// `HandlerError::Malformed` and never reaches `handler`.
    ///
    /// Returns an error if `M` was not declared on the protocol, or if `M`
    /// already has a typed handler.
    pub fn try_register_message<M, F>(&mut self, mut handler: F) -> Result<(), RegistrationError>
    where
        M: Message,
        F: FnMut(&mut C, PeerId, M) -> Result<(), HandlerError> + 'static,
    {
        if !self.message_kinds.contains::<M>() {
            return Err(RegistrationError::MessageKindNotDeclared { name: M::NAME });
        }
        if self.typed_handlers.contains_key(&TypeId::of::<M>()) {
            return Err(RegistrationError::DuplicateMessageType { name: M::NAME });
        }

        self.try_register(M::TAG, M::NAME, move |context, sender, packet| {
            let message = M::deserialize(packet)?;
            handler(context, sender, message)
        })?;
        self.typed_handlers
            .insert(TypeId::of::<M>(), (M::TAG, M::NAME));
        Ok(())
    }

    /// Register a handler for a structured message
    ///
    /// # Panics
    ///
    /// Panics on any registration conflict.
    /// Consider using `try_register_message` for non-panicking error handling.
    pub fn register_message<M, F>(&mut self, handler: F)
    where
        M: Message,
        F: FnMut(&mut C, PeerId, M) -> Result<(), HandlerError> + 'static,
    {
        if let Err(error) = self.try_register_message::<M, F>(handler) {
            panic!("{}", error);
        }
    }

    pub fn has_handlers(&self, tag: u8) -> bool {
        self.handlers
            .get(&tag)
            .is_some_and(|entries| !entries.is_empty())
    }

    pub fn message_kinds(&self) -> &MessageKinds {
        &self.message_kinds
    }

    /// Routes `packet` to every handler registered for its tag.
    ///
    /// Unknown tags and empty packets are dropped and logged, never raised:
    /// peers may run different feature sets.
    pub fn dispatch(&mut self, context: &mut C, sender: PeerId, packet: &[u8]) -> DispatchOutcome {
        let Some(tag) = packet.first().copied() else {
            warn!("Dropping empty packet from {}", sender);
            return DispatchOutcome::Empty;
        };

        let Some(entries) = self
            .handlers
            .get_mut(&tag)
            .filter(|entries| !entries.is_empty())
        else {
            match self.message_kinds.info(tag) {
                Some(info) => warn!(
                    "No handler registered for {} ({:#04x}) from {}, dropping",
                    info.name, tag, sender
                ),
                None => debug!("Dropping packet with unknown tag {:#04x} from {}", tag, sender),
            }
            return DispatchOutcome::UnknownTag { tag };
        };

        let mut failures = 0;
        for entry in entries.iter_mut() {
            if let Err(error) = (entry.handler)(context, sender, packet) {
                failures += 1;
                warn!(
                    "Handler '{}' failed on tag {:#04x} from {}: {}",
                    entry.name, tag, sender, error
                );
            }
        }

        DispatchOutcome::Delivered {
            handlers: entries.len(),
            failures,
        }
    }
}
