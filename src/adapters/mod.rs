//! Adapters: concrete implementations of the reader's port traits.
//!
//! | Adapter   | Implements | Connects to                    |
//! |-----------|------------|--------------------------------|
//! | `fd_link` | Link       | SPP VFS file descriptor        |

pub mod fd_link;
