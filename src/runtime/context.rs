//! Thread-local pointer to the runtime driving the current thread.
//!
//! `block_on` installs its core here for the duration of the call. Free
//! functions such as [`spawn`](super::spawn) and [`now`](super::now) read it.

use crate::error::{Error, Result};
use crate::runtime::Core;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

thread_local! {
    static CURRENT: RefCell<Option<Rc<Core>>> = const { RefCell::new(None) };
}

/// Clears the current runtime when dropped.
#[derive(Debug)]
pub(crate) struct EnterGuard {
    _not_send: PhantomData<Rc<()>>,
}

/// Installs `core` as the current runtime of this thread.
pub(crate) fn enter(core: Rc<Core>) -> Result<EnterGuard> {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        if current.is_some() {
            return Err(Error::NestedRuntime);
        }
        *current = Some(core);
        Ok(EnterGuard {
            _not_send: PhantomData,
        })
    })
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let previous = CURRENT.with(|current| current.borrow_mut().take());
        drop(previous);
    }
}

/// Returns the runtime driving this thread, if any.
pub(crate) fn current() -> Option<Rc<Core>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Returns true while a runtime is driving this thread.
pub(crate) fn is_entered() -> bool {
    CURRENT.with(|current| current.borrow().is_some())
}
