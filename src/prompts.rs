//! The tax-notice analysis prompt.
//!
//! The summariser's output is consumed by a front end that expects exactly
//! the keys below, so the schema lives here as the single source of truth and
//! is covered by tests.

/// Instructions and target JSON shape. The extracted notice text is appended
/// by [`notice_prompt`].
pub const NOTICE_PROMPT_PREAMBLE: &str = r#"You are a meticulous tax notice analyst. Your task is to analyze the following text from an IRS notice and extract specific information into a single, well-structured JSON object. Do not omit any fields. If a field's information cannot be found, return an empty string "" for that value.

Based on the text provided, find and populate the following JSON structure:
{
  "noticeType": "The notice code, like 'CP23' or 'CP503C'",
  "noticeFor": "The full name of the taxpayer, e.g., 'JAMES & KAREN Q. HINDS'",
  "address": "The full address of the taxpayer, with newlines as \n, e.g., '22 BOULDER STREET\nHANSON, CT 00000-7253'",
  "ssn": "The Social Security Number, masked, e.g., 'nnn-nn-nnnn'",
  "amountDue": "The final total amount due as a string, e.g., '$500.73'",
  "payBy": "The payment due date as a string, e.g., 'February 20, 2018'",
  "breakdown": [
    { "item": "The first line item in the billing summary", "amount": "Its corresponding amount" },
    { "item": "The second line item", "amount": "Its amount" }
  ],
  "noticeMeaning": "A concise, 2-line professional explanation of what this specific notice type means.",
  "whyText": "A paragraph explaining exactly why the user received this notice, based on the text.",
  "fixSteps": {
    "agree": "A string explaining the steps to take if the user agrees.",
    "disagree": "A string explaining the steps to take if the user disagrees."
  },
  "paymentOptions": {
    "online": "The URL for online payments, e.g., 'www.irs.gov/payments'",
    "mail": "Instructions for paying by mail.",
    "plan": "The URL for setting up a payment plan, e.g., 'www.irs.gov/paymentplan'"
  },
  "helpInfo": {
    "contact": "The primary contact phone number for questions.",
    "advocate": "Information about the Taxpayer Advocate Service, including their phone number."
  }
}

Here is the text to analyze:"#;

/// Top-level keys the summary is expected to carry.
pub const SUMMARY_KEYS: &[&str] = &[
    "noticeType",
    "noticeFor",
    "address",
    "ssn",
    "amountDue",
    "payBy",
    "breakdown",
    "noticeMeaning",
    "whyText",
    "fixSteps",
    "paymentOptions",
    "helpInfo",
];

/// Build the full prompt for one notice.
pub fn notice_prompt(text: &str) -> String {
    format!("{NOTICE_PROMPT_PREAMBLE}\n---\n{text}\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_text_in_rules() {
        let p = notice_prompt("CP14 Balance due");
        assert!(p.ends_with("---\nCP14 Balance due\n---\n"));
        assert!(p.starts_with("You are a meticulous tax notice analyst."));
    }

    #[test]
    fn preamble_names_every_summary_key() {
        for key in SUMMARY_KEYS {
            assert!(
                NOTICE_PROMPT_PREAMBLE.contains(&format!("\"{key}\"")),
                "prompt is missing key {key}"
            );
        }
    }
}
