use super::{Notice, OutgoingMail};
use crate::passes::repo_types::Pass;

pub fn render(notice: &Notice) -> OutgoingMail {
    match notice {
        Notice::PassCreated(pass) => pass_mail(
            pass,
            "Your exeat request has been received",
            "has been received and is awaiting review",
        ),
        Notice::PassApproved(pass) => pass_mail(
            pass,
            "Your exeat request has been approved",
            "has been approved",
        ),
        Notice::PassRejected(pass) => pass_mail(
            pass,
            "Your exeat request has been rejected",
            "has been rejected",
        ),
        Notice::ResetCode {
            name,
            email,
            code,
            ttl_minutes,
        } => OutgoingMail {
            to_address: email.clone(),
            to_name: name.clone(),
            subject: "Your password reset code".into(),
            text_body: format!(
                "Hello {name},\n\nYour password reset code is {code}. \
                 It expires in {ttl_minutes} minutes.\n\n\
                 If you did not request a reset you can ignore this email."
            ),
            html_body: format!(
                "<p>Hello {},</p>\
                 <p>Your password reset code is <strong>{code}</strong>. \
                 It expires in {ttl_minutes} minutes.</p>\
                 <p>If you did not request a reset you can ignore this email.</p>",
                escape(name)
            ),
        },
    }
}

fn pass_mail(pass: &Pass, subject: &str, outcome: &str) -> OutgoingMail {
    let text_body = format!(
        "Hello {name},\n\nYour exeat request to {location} departing {date} {outcome}.\n\n\
         Reason: {reason}\nHostel: {hostel}\nStatus: {status}\n",
        name = pass.name,
        location = pass.location,
        date = pass.departure_date,
        reason = pass.reason,
        hostel = pass.hostel,
        status = pass.status,
    );
    let html_body = format!(
        "<p>Hello {name},</p>\
         <p>Your exeat request to <strong>{location}</strong> departing {date} {outcome}.</p>\
         <ul><li>Reason: {reason}</li><li>Hostel: {hostel}</li>\
         <li>Status: <strong>{status}</strong></li></ul>",
        name = escape(&pass.name),
        location = escape(&pass.location),
        date = escape(&pass.departure_date),
        reason = escape(&pass.reason),
        hostel = escape(&pass.hostel),
        status = pass.status,
    );
    OutgoingMail {
        to_address: pass.email.clone(),
        to_name: pass.name.clone(),
        subject: subject.to_string(),
        text_body,
        html_body,
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::repo_types::PassStatus;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn pass(status: PassStatus) -> Pass {
        let now = OffsetDateTime::now_utc();
        Pass {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ada <Obi>".into(),
            email: "ada@example.com".into(),
            matric_number: "19CS1234".into(),
            department: "Computer Engineering".into(),
            faculty: "Engineering".into(),
            phone_number: "08030000000".into(),
            parent_phone_number: "08031111111".into(),
            departure_date: "2026-11-01".into(),
            location: "Lagos".into(),
            hostel: "Hall 3".into(),
            reason: "Family event".into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn approval_mail_goes_to_snapshotted_email() {
        let mail = render(&Notice::PassApproved(pass(PassStatus::Approved)));
        assert_eq!(mail.to_address, "ada@example.com");
        assert!(mail.subject.contains("approved"));
        assert!(mail.text_body.contains("Status: Approved"));
        assert!(mail.html_body.contains("Ada &lt;Obi&gt;"));
    }

    #[test]
    fn reset_mail_carries_code() {
        let mail = render(&Notice::ResetCode {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            code: "482913".into(),
            ttl_minutes: 60,
        });
        assert!(mail.text_body.contains("482913"));
        assert!(mail.html_body.contains("482913"));
        assert!(mail.text_body.contains("60 minutes"));
    }
}
