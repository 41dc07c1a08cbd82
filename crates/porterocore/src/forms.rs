//! Multi-step admin forms as an explicit state machine.
//!
//! Each guided flow (add category, add plan, set bundle, set payment rail)
//! is a sequence of prompts. `advance(state, input)` is pure: it parses the
//! input, returns the next state (or `None` when the flow ends) and an
//! effect for the bot layer to execute. Database-dependent checks (does the
//! category exist) stay in the executor; a failed check keeps the state and
//! re-prompts.

use dashmap::DashMap;

use crate::core::validation::{
    parse_bundle_links, parse_chat_id, parse_duration_days, parse_invite_target,
};

/// Which payment rail a value is being set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRail {
    Upi,
    Paypal,
    Crypto,
}

impl PaymentRail {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "upi" => Some(PaymentRail::Upi),
            "paypal" => Some(PaymentRail::Paypal),
            "crypto" => Some(PaymentRail::Crypto),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentRail::Upi => "UPI",
            PaymentRail::Paypal => "PayPal",
            PaymentRail::Crypto => "Crypto",
        }
    }
}

/// A fully collected plan, ready for the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDraft {
    pub category_id: i64,
    pub name: String,
    pub invite_link: String,
    pub target_chat_id: i64,
    pub price: String,
    pub duration_days: i64,
}

/// Position inside a multi-step flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    // /addcategory
    CategoryName,

    // /addplan
    PlanCategory,
    PlanName {
        category_id: i64,
    },
    PlanTarget {
        category_id: i64,
        name: String,
    },
    PlanPrice {
        category_id: i64,
        name: String,
        invite_link: String,
        target_chat_id: i64,
    },
    PlanDuration {
        category_id: i64,
        name: String,
        invite_link: String,
        target_chat_id: i64,
        price: String,
    },

    // /setbundle
    BundleLinks,
    BundlePrice {
        links: Vec<String>,
    },
    BundleDuration {
        links: Vec<String>,
        price: String,
    },

    // /setpayment
    PaymentRail,
    PaymentValue {
        rail: PaymentRail,
    },
}

/// What the executor must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEffect {
    /// Send this prompt (next question, or an error plus the same question)
    Prompt(String),
    CreateCategory {
        name: String,
    },
    /// Executor must verify the category exists before moving on
    SelectPlanCategory {
        category_id: i64,
    },
    CreatePlan(PlanDraft),
    SetBundle {
        links: Vec<String>,
        price: String,
        duration_days: i64,
    },
    SetPaymentRail {
        rail: PaymentRail,
        value: String,
    },
    Cancelled,
}

/// Prompt shown when a flow is started (before any input).
pub fn opening_prompt(state: &FormState) -> String {
    match state {
        FormState::CategoryName => "Send the category name.".to_string(),
        FormState::PlanCategory => "Send the category id the plan belongs to.".to_string(),
        FormState::BundleLinks => {
            "Send the bundle invite links, comma separated.".to_string()
        }
        FormState::PaymentRail => "Which rail? Send one of: upi, paypal, crypto.".to_string(),
        _ => String::new(),
    }
}

/// Advance a form with one message of input.
///
/// Returns the next state (`None` ends the flow) and the effect to execute.
pub fn advance(state: FormState, input: &str) -> (Option<FormState>, FormEffect) {
    let text = input.trim();

    if text.eq_ignore_ascii_case("/cancel") {
        return (None, FormEffect::Cancelled);
    }

    match state {
        FormState::CategoryName => {
            if text.is_empty() {
                return (
                    Some(FormState::CategoryName),
                    FormEffect::Prompt("Name cannot be empty. Send the category name.".to_string()),
                );
            }
            (None, FormEffect::CreateCategory { name: text.to_string() })
        }

        FormState::PlanCategory => match parse_chat_id(text) {
            Ok(category_id) => (
                Some(FormState::PlanName { category_id }),
                FormEffect::SelectPlanCategory { category_id },
            ),
            Err(e) => (
                Some(FormState::PlanCategory),
                FormEffect::Prompt(format!("{}. Send the category id.", e)),
            ),
        },

        FormState::PlanName { category_id } => {
            if text.is_empty() {
                return (
                    Some(FormState::PlanName { category_id }),
                    FormEffect::Prompt("Name cannot be empty. Send the plan name.".to_string()),
                );
            }
            (
                Some(FormState::PlanTarget {
                    category_id,
                    name: text.to_string(),
                }),
                FormEffect::Prompt("Send the invite target as InviteLink|ChatID.".to_string()),
            )
        }

        FormState::PlanTarget { category_id, name } => match parse_invite_target(text) {
            Ok(target) => (
                Some(FormState::PlanPrice {
                    category_id,
                    name,
                    invite_link: target.invite_link,
                    target_chat_id: target.chat_id,
                }),
                FormEffect::Prompt("Send the price (shown to buyers as-is).".to_string()),
            ),
            Err(e) => (
                Some(FormState::PlanTarget { category_id, name }),
                FormEffect::Prompt(format!("{}. Send the invite target as InviteLink|ChatID.", e)),
            ),
        },

        FormState::PlanPrice {
            category_id,
            name,
            invite_link,
            target_chat_id,
        } => {
            if text.is_empty() {
                return (
                    Some(FormState::PlanPrice {
                        category_id,
                        name,
                        invite_link,
                        target_chat_id,
                    }),
                    FormEffect::Prompt("Price cannot be empty. Send the price.".to_string()),
                );
            }
            (
                Some(FormState::PlanDuration {
                    category_id,
                    name,
                    invite_link,
                    target_chat_id,
                    price: text.to_string(),
                }),
                FormEffect::Prompt("Send the duration in days.".to_string()),
            )
        }

        FormState::PlanDuration {
            category_id,
            name,
            invite_link,
            target_chat_id,
            price,
        } => match parse_duration_days(text) {
            Ok(duration_days) => (
                None,
                FormEffect::CreatePlan(PlanDraft {
                    category_id,
                    name,
                    invite_link,
                    target_chat_id,
                    price,
                    duration_days,
                }),
            ),
            Err(e) => (
                Some(FormState::PlanDuration {
                    category_id,
                    name,
                    invite_link,
                    target_chat_id,
                    price,
                }),
                FormEffect::Prompt(format!("{}. Send the duration in days.", e)),
            ),
        },

        FormState::BundleLinks => match parse_bundle_links(text) {
            Ok(links) => (
                Some(FormState::BundlePrice { links }),
                FormEffect::Prompt("Send the bundle price.".to_string()),
            ),
            Err(_) => (
                Some(FormState::BundleLinks),
                FormEffect::Prompt("Send at least one invite link, comma separated.".to_string()),
            ),
        },

        FormState::BundlePrice { links } => {
            if text.is_empty() {
                return (
                    Some(FormState::BundlePrice { links }),
                    FormEffect::Prompt("Price cannot be empty. Send the bundle price.".to_string()),
                );
            }
            (
                Some(FormState::BundleDuration {
                    links,
                    price: text.to_string(),
                }),
                FormEffect::Prompt("Send the bundle duration in days.".to_string()),
            )
        }

        FormState::BundleDuration { links, price } => match parse_duration_days(text) {
            Ok(duration_days) => (
                None,
                FormEffect::SetBundle {
                    links,
                    price,
                    duration_days,
                },
            ),
            Err(e) => (
                Some(FormState::BundleDuration { links, price }),
                FormEffect::Prompt(format!("{}. Send the bundle duration in days.", e)),
            ),
        },

        FormState::PaymentRail => match PaymentRail::parse(text) {
            Some(rail) => (
                Some(FormState::PaymentValue { rail }),
                FormEffect::Prompt(format!("Send the {} payment details.", rail.label())),
            ),
            None => (
                Some(FormState::PaymentRail),
                FormEffect::Prompt("Unknown rail. Send one of: upi, paypal, crypto.".to_string()),
            ),
        },

        FormState::PaymentValue { rail } => {
            if text.is_empty() {
                return (
                    Some(FormState::PaymentValue { rail }),
                    FormEffect::Prompt("Value cannot be empty. Send the payment details.".to_string()),
                );
            }
            (
                None,
                FormEffect::SetPaymentRail {
                    rail,
                    value: text.to_string(),
                },
            )
        }
    }
}

/// Per-admin active form state.
#[derive(Default)]
pub struct FormStore {
    inner: DashMap<i64, FormState>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, admin_id: i64, state: FormState) -> String {
        let prompt = opening_prompt(&state);
        self.inner.insert(admin_id, state);
        prompt
    }

    pub fn take(&self, admin_id: i64) -> Option<FormState> {
        self.inner.remove(&admin_id).map(|(_, state)| state)
    }

    pub fn put(&self, admin_id: i64, state: FormState) {
        self.inner.insert(admin_id, state);
    }

    pub fn clear(&self, admin_id: i64) -> bool {
        self.inner.remove(&admin_id).is_some()
    }

    pub fn is_active(&self, admin_id: i64) -> bool {
        self.inner.contains_key(&admin_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(mut state: FormState, inputs: &[&str]) -> (Option<FormState>, FormEffect) {
        let mut last = (None, FormEffect::Cancelled);
        for input in inputs {
            last = advance(state, input);
            state = match last.0.clone() {
                Some(s) => s,
                None => return last,
            };
        }
        last
    }

    #[test]
    fn add_plan_walks_all_steps() {
        let (next, effect) = walk(
            FormState::PlanCategory,
            &["1", "VIP", "https://t.me/+abc|-100555", "$10", "30"],
        );
        assert_eq!(next, None);
        assert_eq!(
            effect,
            FormEffect::CreatePlan(PlanDraft {
                category_id: 1,
                name: "VIP".to_string(),
                invite_link: "https://t.me/+abc".to_string(),
                target_chat_id: -100555,
                price: "$10".to_string(),
                duration_days: 30,
            })
        );
    }

    #[test]
    fn bad_duration_reprompts_without_losing_progress() {
        let (next, effect) = walk(
            FormState::PlanCategory,
            &["1", "VIP", "https://t.me/+abc|-100555", "$10", "a month"],
        );
        assert!(matches!(effect, FormEffect::Prompt(ref p) if p.contains("duration")));
        // Still sitting on the duration step with everything collected
        assert!(matches!(next, Some(FormState::PlanDuration { ref price, .. }) if price == "$10"));
    }

    #[test]
    fn malformed_invite_target_reprompts() {
        let (next, effect) = walk(FormState::PlanCategory, &["1", "VIP", "no-separator-here"]);
        assert!(matches!(effect, FormEffect::Prompt(_)));
        assert!(matches!(next, Some(FormState::PlanTarget { .. })));
    }

    #[test]
    fn cancel_ends_any_step() {
        let (next, effect) = walk(FormState::PlanCategory, &["1", "/cancel"]);
        assert_eq!(next, None);
        assert_eq!(effect, FormEffect::Cancelled);
    }

    #[test]
    fn bundle_flow_collects_links_price_duration() {
        let (next, effect) = walk(
            FormState::BundleLinks,
            &["https://t.me/+a, https://t.me/+b", "$25", "90"],
        );
        assert_eq!(next, None);
        assert_eq!(
            effect,
            FormEffect::SetBundle {
                links: vec!["https://t.me/+a".to_string(), "https://t.me/+b".to_string()],
                price: "$25".to_string(),
                duration_days: 90,
            }
        );
    }

    #[test]
    fn payment_flow_picks_rail_then_value() {
        let (next, effect) = walk(FormState::PaymentRail, &["UPI", "someone@bank"]);
        assert_eq!(next, None);
        assert_eq!(
            effect,
            FormEffect::SetPaymentRail {
                rail: PaymentRail::Upi,
                value: "someone@bank".to_string(),
            }
        );
    }

    #[test]
    fn category_form_creates_on_first_input() {
        let (next, effect) = advance(FormState::CategoryName, "Movies");
        assert_eq!(next, None);
        assert_eq!(
            effect,
            FormEffect::CreateCategory {
                name: "Movies".to_string()
            }
        );
    }

    #[test]
    fn form_store_take_removes_state() {
        let store = FormStore::new();
        store.start(1, FormState::CategoryName);
        assert!(store.is_active(1));
        assert_eq!(store.take(1), Some(FormState::CategoryName));
        assert!(!store.is_active(1));
    }
}
