//! Task description sent to Maestro for an appeal submission.

use crate::models::SubmittedAppeal;
use serde_json::{json, Value};

const NOT_PROVIDED: &str = "not provided";

const INSTRUCTIONS: &str = "\
You are an assistant helping a patient respond to a denied health insurance claim.
Read the denial letter and, when available, the insurance policy document from the
file library. Decide on exactly one course of action:
- \"appeal\": the denial contradicts the policy and should be contested in writing.
- \"code_for_change\": the claim was denied because of a billing or procedure code
  problem that the provider should correct and resubmit.
- \"settlement\": the denial is valid or contesting it is unlikely to succeed, so the
  patient should negotiate the amount owed.

List the concrete steps the patient should take, in order.
Write an appeal letter only when the decision is \"appeal\"; otherwise set
\"appeal_letter\" to null.

Respond with a single JSON object that validates against this JSON schema, with no
other text:";

/// JSON schema of the expected run result.
pub fn result_schema() -> Value {
    json!({
        "title": "SubmitAppealOutput",
        "type": "object",
        "properties": {
            "decision": {
                "title": "Decision",
                "type": "string",
                "enum": ["appeal", "code_for_change", "settlement"]
            },
            "action_steps": {
                "title": "Action Steps",
                "type": "array",
                "items": { "type": "string" }
            },
            "appeal_letter": {
                "title": "Appeal Letter",
                "anyOf": [{ "type": "string" }, { "type": "null" }],
                "default": null
            }
        },
        "required": ["decision", "action_steps"]
    })
}

fn worked_examples() -> [(&'static str, Value); 3] {
    [
        (
            "An MRI was denied as not medically necessary although the policy covers \
             diagnostic imaging ordered by a specialist.",
            json!({
                "decision": "appeal",
                "action_steps": [
                    "Request the full claim file from the insurer",
                    "Ask the ordering specialist for a letter of medical necessity",
                    "Send the appeal letter before the appeal deadline"
                ],
                "appeal_letter": "Dear Claims Review Team, I am writing to appeal the denial of my MRI claim..."
            }),
        ),
        (
            "An office visit was denied because it was billed with a code reserved for \
             preventive care.",
            json!({
                "decision": "code_for_change",
                "action_steps": [
                    "Call the provider's billing office and cite the denial reason",
                    "Ask them to resubmit the claim with the correct visit code"
                ],
                "appeal_letter": null
            }),
        ),
        (
            "A cosmetic procedure was denied and the policy explicitly excludes cosmetic \
             surgery.",
            json!({
                "decision": "settlement",
                "action_steps": [
                    "Ask the provider for an itemized bill",
                    "Negotiate a self-pay discount or a payment plan"
                ],
                "appeal_letter": null
            }),
        ),
    ]
}

/// Render the full task input for one submission.
pub fn build_appeal_task(appeal: &SubmittedAppeal) -> String {
    let schema = serde_json::to_string_pretty(&result_schema()).unwrap_or_default();

    let mut task = String::with_capacity(4096);
    task.push_str(INSTRUCTIONS);
    task.push('\n');
    task.push_str(&schema);
    task.push_str("\n\nExamples:\n");

    for (index, (situation, output)) in worked_examples().iter().enumerate() {
        task.push_str(&format!(
            "\nExample {}\nSituation: {}\nOutput: {}\n",
            index + 1,
            situation,
            output
        ));
    }

    fn field(value: &Option<String>) -> &str {
        SubmittedAppeal::provided(value).unwrap_or(NOT_PROVIDED)
    }
    task.push_str(&format!(
        "\nPatient details:\n\
         Name: {}\n\
         Date of birth: {}\n\
         Denial letter file id: {}\n\
         Insurance policy file id: {}\n\
         Additional information: {}\n",
        appeal.name.trim(),
        field(&appeal.dob),
        appeal.denial_letter.trim(),
        field(&appeal.policy_doc_file_id),
        field(&appeal.additional_info),
    ));

    task
}
