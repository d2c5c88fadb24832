//! # Register Session
//!
//! Everything that belongs to the operator at the till: who they are, the
//! cart they are building and the discount rules they work under.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login ──► RegisterSession { actor, cart, policy }                     │
//! │                 │                                                       │
//! │                 ├── commands borrow it mutably, one at a time           │
//! │                 │                                                       │
//! │  logout ──► dropped (an open cart goes with it)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cardpos_core::{Actor, Cart, DiscountPolicy, User};

/// One operator's checkout session.
#[derive(Debug, Clone)]
pub struct RegisterSession {
    pub actor: Actor,
    pub cart: Cart,
    pub policy: DiscountPolicy,
}

impl RegisterSession {
    pub fn new(actor: Actor, policy: DiscountPolicy) -> Self {
        RegisterSession {
            actor,
            cart: Cart::new(),
            policy,
        }
    }

    /// Session for an authenticated user, starting with an empty cart.
    pub fn for_user(user: &User, policy: DiscountPolicy) -> Self {
        RegisterSession::new(Actor::from(user), policy)
    }
}
