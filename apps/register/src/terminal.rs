//! # Terminal Loop
//!
//! Line-oriented front end: one command per line, one reply per command.
//!
//! ## Commands
//! ```text
//! login <user> <password>            open a session
//! logout                             close it (an open cart is discarded)
//! find [text]                        search products, with today's price
//! add <code> [qty]                   add to cart (default 1)
//! qty <code> <+n|-n>                 change a line's quantity
//! rm <code>                          remove a line
//! discount <10% | 5.00> [note...]    manual cart discount, 0 removes it
//! cart                               show the cart
//! customer <doc>                     look a customer up, with recent purchases
//! customer new <type> <doc> <name>   register a customer
//! pay <method> [amount] [--customer <doc>] [--note <text...>]
//! clear                              empty the cart
//! help | quit
//! ```
//!
//! Errors are printed and the loop carries on. The session is owned here
//! and handed to commands by `&mut`.

use std::fmt::Write as _;

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::commands::{auth, cart, customer, product, sale};
use crate::config::RegisterConfig;
use crate::error::ApiError;
use crate::session::RegisterSession;
use cardpos_core::{CustomerDraft, DiscountPolicy, Money};
use cardpos_db::Database;

const HELP: &str = "\
login <user> <password> | logout
find [text]
add <code> [qty] | qty <code> <+n|-n> | rm <code> | clear | cart
discount <10% | 5.00> [note...]
customer <doc> | customer new <type> <doc> <name...>
pay <cash|card|yape|plin|transfer> [amount] [--customer <doc>] [--note <text...>]
help | quit";

// =============================================================================
// Parsing
// =============================================================================

/// A parsed terminal line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Find(String),
    Add { code: String, quantity: Option<i64> },
    Qty { code: String, delta: i64 },
    Remove(String),
    Discount { input: String, note: Option<String> },
    Cart,
    FindCustomer(String),
    NewCustomer(CustomerDraft),
    Pay(sale::CheckoutInput),
    Clear,
    Help,
    Quit,
}

impl Command {
    /// Verb only, for logging. Arguments may hold a password.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Find(_) => "find",
            Command::Add { .. } => "add",
            Command::Qty { .. } => "qty",
            Command::Remove(_) => "rm",
            Command::Discount { .. } => "discount",
            Command::Cart => "cart",
            Command::FindCustomer(_) | Command::NewCustomer(_) => "customer",
            Command::Pay(_) => "pay",
            Command::Clear => "clear",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

/// Parses one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, ApiError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("login", [username, password]) => Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        },
        ("logout", []) => Command::Logout,
        ("find", rest) => Command::Find(rest.join(" ")),
        ("add", [code]) => Command::Add {
            code: code.to_string(),
            quantity: None,
        },
        ("add", [code, qty]) => Command::Add {
            code: code.to_string(),
            quantity: Some(parse_int("quantity", qty)?),
        },
        ("qty", [code, delta]) => Command::Qty {
            code: code.to_string(),
            delta: parse_int("quantity change", delta.trim_start_matches('+'))?,
        },
        ("rm", [code]) => Command::Remove(code.to_string()),
        ("discount", [input, note @ ..]) => Command::Discount {
            input: input.to_string(),
            note: (!note.is_empty()).then(|| note.join(" ")),
        },
        ("cart", []) => Command::Cart,
        ("customer", ["new", document_type, document, name @ ..]) if !name.is_empty() => {
            Command::NewCustomer(CustomerDraft {
                document_type: document_type.to_string(),
                document_number: document.to_string(),
                name: name.join(" "),
                ..Default::default()
            })
        }
        ("customer", [document]) => Command::FindCustomer(document.to_string()),
        ("pay", [method, rest @ ..]) => Command::Pay(parse_payment(method, rest)?),
        ("clear", []) => Command::Clear,
        ("help", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (verb, _) => {
            return Err(ApiError::validation(format!(
                "Unrecognised command '{}'; type 'help'",
                verb
            )))
        }
    };

    Ok(Some(command))
}

fn parse_int(field: &str, text: &str) -> Result<i64, ApiError> {
    text.parse()
        .map_err(|_| ApiError::validation(format!("{} must be a whole number, got '{}'", field, text)))
}

fn parse_payment(method: &str, rest: &[&str]) -> Result<sale::CheckoutInput, ApiError> {
    let mut input = sale::CheckoutInput::new(method);
    let mut i = 0;

    while i < rest.len() {
        match rest[i] {
            "--customer" => {
                let document = rest
                    .get(i + 1)
                    .ok_or_else(|| ApiError::validation("--customer needs a document number"))?;
                input.customer_document = Some(document.to_string());
                i += 2;
            }
            "--note" => {
                input.note = Some(rest[i + 1..].join(" "));
                break;
            }
            amount if input.tendered.is_none() => {
                input.tendered = Some(amount.to_string());
                i += 1;
            }
            other => {
                return Err(ApiError::validation(format!("Unexpected argument '{}'", other)));
            }
        }
    }

    Ok(input)
}

// =============================================================================
// Terminal
// =============================================================================

/// What the loop should do after a line.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

/// The register front end. Owns the (optional) operator session.
pub struct Terminal {
    db: Database,
    config: RegisterConfig,
    policy: DiscountPolicy,
    session: Option<RegisterSession>,
}

impl Terminal {
    pub fn new(db: Database, config: RegisterConfig, policy: DiscountPolicy) -> Self {
        Terminal {
            db,
            config,
            policy,
            session: None,
        }
    }

    /// Reads commands from `input` until EOF or `quit`, replying on `output`.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        output
            .write_all(format!("{} register. Type 'help'.\n", self.config.store.name).as_bytes())
            .await?;

        loop {
            output.write_all(self.prompt().as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let reply = match self.handle_line(&line).await {
                Ok(Outcome::Quit) => break,
                Ok(Outcome::Reply(text)) => text,
                Err(e) => format!("✗ [{}] {}", code_label(&e), e.message),
            };

            if !reply.is_empty() {
                output.write_all(reply.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }

        output.write_all(b"bye\n").await?;
        output.flush().await
    }

    fn prompt(&self) -> String {
        match &self.session {
            Some(session) => format!("{}> ", session.actor.username),
            None => "> ".to_string(),
        }
    }

    /// Parses and executes one line.
    pub async fn handle_line(&mut self, line: &str) -> Result<Outcome, ApiError> {
        match parse_command(line)? {
            Some(command) => self.execute(command).await,
            None => Ok(Outcome::Reply(String::new())),
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Outcome, ApiError> {
        debug!(command = command.name(), "Executing terminal command");

        let reply = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Help => HELP.to_string(),
            Command::Login { username, password } => {
                let session = auth::login(&self.db, &username, &password, self.policy).await?;
                let reply = format!(
                    "Logged in as {} ({})",
                    session.actor.username, session.actor.role
                );
                self.session = Some(session);
                reply
            }
            Command::Logout => match self.session.take() {
                Some(session) => {
                    info!(username = %session.actor.username, "Logged out");
                    format!("Goodbye {}", session.actor.username)
                }
                None => "Not logged in".to_string(),
            },
            Command::Find(query) => {
                let hits = product::search_products(&self.db, &query, None).await?;
                self.render_listings(&hits)
            }
            Command::FindCustomer(document) => {
                let history = customer::customer_history(&self.db, &document).await?;
                self.render_customer(&history)
            }
            Command::NewCustomer(draft) => {
                let created = customer::register_customer(&self.db, draft).await?;
                format!("Registered {} ({})", created.name, created.document_number)
            }
            command => return self.execute_in_session(command).await,
        };

        Ok(Outcome::Reply(reply))
    }

    /// Commands that need a logged-in operator.
    async fn execute_in_session(&mut self, command: Command) -> Result<Outcome, ApiError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ApiError::unauthorized("Log in first"))?;

        let response = match command {
            Command::Add { code, quantity } => {
                cart::add_to_cart(&self.db, session, &code, quantity).await?
            }
            Command::Qty { code, delta } => {
                cart::change_quantity(&self.db, session, &code, delta).await?
            }
            Command::Remove(code) => cart::remove_from_cart(session, &code)?,
            Command::Discount { input, note } => cart::apply_discount(session, &input, note)?,
            Command::Clear => cart::clear_cart(session),
            Command::Cart => cart::get_cart(session),
            Command::Pay(input) => {
                let receipt = sale::checkout(&self.db, session, input).await?;
                return Ok(Outcome::Reply(self.render_receipt(&receipt)));
            }
            _ => return Err(ApiError::internal("command not routed")),
        };

        Ok(Outcome::Reply(self.render_cart(&response)))
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn render_listings(&self, hits: &[product::ProductListing]) -> String {
        if hits.is_empty() {
            return "No products found".to_string();
        }

        let mut out = String::new();
        for hit in hits {
            let _ = write!(
                out,
                "{:<16} {:<32} x{:<4} {:>12}",
                hit.code,
                hit.name,
                hit.stock,
                self.config.format_money(hit.unit_price)
            );
            if let Some(campaign) = &hit.campaign {
                let _ = write!(
                    out,
                    "  (was {}, {})",
                    self.config.format_money(hit.list_price),
                    campaign.name
                );
            }
            if hit.low_stock {
                out.push_str("  [low]");
            }
            out.push('\n');
        }
        out.pop();
        out
    }

    fn render_customer(&self, history: &customer::CustomerHistory) -> String {
        let c = &history.customer;
        let mut out = format!("{} {}  {}\n", c.document_type, c.document_number, c.name);
        if history.purchases.is_empty() {
            out.push_str("  no purchases yet\n");
            return out;
        }
        for sale in &history.purchases {
            let _ = writeln!(
                out,
                "  {}  {}  {}",
                sale.sale_number,
                sale.created_at.with_timezone(&Local).format("%Y-%m-%d"),
                self.config.format_money(sale.total())
            );
        }
        let _ = writeln!(
            out,
            "  recent total {}",
            self.config.format_money(history.recent_total)
        );
        out
    }

    fn render_cart(&self, cart: &cart::CartResponse) -> String {
        if cart.lines.is_empty() {
            return "Cart is empty".to_string();
        }

        let money = |m| self.config.format_money(m);
        let mut out = String::new();

        for (i, line) in cart.lines.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}. {:<16} {:<28} {:>3} x {:>10} = {:>12}",
                i + 1,
                line.code,
                line.name,
                line.quantity,
                money(line.unit_price),
                money(line.line_total())
            );
            if let Some(campaign) = &line.campaign {
                let _ = writeln!(
                    out,
                    "    {} (list {})",
                    campaign.name,
                    money(line.list_price)
                );
            }
        }

        let _ = writeln!(out, "    Subtotal {:>12}", money(cart.totals.subtotal));
        if let Some(discount) = &cart.discount {
            let _ = write!(
                out,
                "    Discount {:>12}  ({} by {}",
                money(Money::zero() - discount.amount),
                discount.request,
                discount.applied_by
            );
            if let Some(note) = &discount.note {
                let _ = write!(out, ": {}", note);
            }
            out.push_str(")\n");
        }
        let _ = write!(out, "    TOTAL    {:>12}", money(cart.totals.total));
        out
    }

    fn render_receipt(&self, receipt: &sale::Receipt) -> String {
        let money = |m| self.config.format_money(m);
        let mut out = String::new();

        let _ = writeln!(out, "==== {} ====", self.config.store.name);
        let _ = writeln!(
            out,
            "Sale {}  {}",
            receipt.sale_number,
            receipt.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(out, "Seller: {}", receipt.seller);
        if let Some(name) = &receipt.customer_name {
            let _ = writeln!(out, "Customer: {}", name);
        }
        for line in &receipt.lines {
            let _ = writeln!(
                out,
                "  {:<28} {:>3} x {:>10} = {:>12}",
                line.name,
                line.quantity,
                money(line.unit_price),
                money(line.line_total)
            );
        }
        let _ = writeln!(out, "  Subtotal {:>12}", money(receipt.subtotal));
        if receipt.campaign_savings.is_positive() {
            let _ = writeln!(out, "  (campaigns saved you {})", money(receipt.campaign_savings));
        }
        if receipt.discount.is_positive() {
            let _ = writeln!(out, "  Discount {:>12}", money(Money::zero() - receipt.discount));
        }
        let _ = writeln!(out, "  TOTAL    {:>12}", money(receipt.total));
        let _ = writeln!(
            out,
            "  {} {:>12}  change {}",
            receipt.payment_method,
            money(receipt.amount_received),
            money(receipt.change)
        );
        let _ = write!(out, "==== thank you ====");
        out
    }
}

fn code_label(err: &ApiError) -> String {
    serde_json::to_value(err.code)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", err.code))
}
