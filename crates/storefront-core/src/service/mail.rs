//! Outgoing mail
//!
//! Messages are rendered to plain text here and handed to a `Mailer`.

use std::fmt::Write;

use async_trait::async_trait;
use storefront_common::Money;

use crate::pricing::{CartTotals, LineItem};
use crate::service::settings::EmailTemplate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> anyhow::Result<()>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> anyhow::Result<()> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Mail sent\n{}",
            message.body
        );
        Ok(())
    }
}

/// Values substituted into `{first_name}` and `{order_id}` placeholders
#[derive(Clone, Debug)]
pub struct Recipient<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub order_id: i64,
}

fn fill_placeholders(text: &str, recipient: &Recipient<'_>) -> String {
    text.replace("{first_name}", recipient.first_name)
        .replace("{order_id}", &recipient.order_id.to_string())
}

fn cell(column: &str, line: &LineItem) -> String {
    match column {
        "name" => line.name.clone(),
        "price" => line.unit_price_with_vat().to_string(),
        "subtotal" => line.total_with_vat().to_string(),
        "quantity" => line.quantity.to_string(),
        _ => String::new(),
    }
}

fn header(column: &str) -> &str {
    match column {
        "name" => "Product",
        "price" => "Price",
        "subtotal" => "Subtotal",
        "quantity" => "Quantity",
        other => other,
    }
}

/// Renders the order table with the template's columns, padded to the
/// widest cell. The border weight is the number of rule lines drawn above
/// and below the header.
pub fn render_table(template: &EmailTemplate, lines: &[LineItem]) -> String {
    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| template.table.iter().map(|c| cell(c, line)).collect())
        .collect();

    let widths: Vec<usize> = template
        .table
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header(c).len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let total_width = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    let rule = "-".repeat(total_width);
    let weight = template.table_border_weight.max(1) as usize;

    let format_row = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    for _ in 0..weight {
        let _ = writeln!(out, "{}", rule);
    }
    let _ = writeln!(
        out,
        "{}",
        format_row(template.table.iter().map(|c| header(c).to_string()).collect())
    );
    for _ in 0..weight {
        let _ = writeln!(out, "{}", rule);
    }
    for row in rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
    let _ = writeln!(out, "{}", rule);

    out
}

/// Builds the order confirmation (or payment) mail from a template.
pub fn render_order_email(
    template: &EmailTemplate,
    recipient: &Recipient<'_>,
    lines: &[LineItem],
    totals: &CartTotals,
    vouchers_sum: Money,
) -> MailMessage {
    let mut body = String::new();

    let _ = writeln!(body, "{}", fill_placeholders(&template.upper, recipient));
    let _ = writeln!(body);
    body.push_str(&render_table(template, lines));
    let _ = writeln!(body, "Subtotal: {}", totals.sub_total);
    let _ = writeln!(body, "VAT: {}", totals.vat_sum);
    if vouchers_sum.is_positive() {
        let _ = writeln!(body, "Vouchers: -{}", vouchers_sum);
    }
    let grand_total = (totals.grand_total - vouchers_sum).max(Money::ZERO);
    let _ = writeln!(body, "Total: {}", grand_total);
    let _ = writeln!(body);
    let _ = write!(body, "{}", fill_placeholders(&template.lower, recipient));

    MailMessage {
        from: template.sender.clone(),
        to: recipient.email.to_string(),
        subject: fill_placeholders(&template.subject, recipient),
        body,
    }
}
