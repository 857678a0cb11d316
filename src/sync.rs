#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        sync::{
            atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
            Condvar, Mutex,
        },
        thread,
    };
    pub(crate) use std::sync::Arc;
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::{
        sync::{
            atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
            Arc, Condvar, Mutex,
        },
        thread,
    };
}

pub(crate) use imp::*;
