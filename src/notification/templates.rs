use chrono::NaiveDate;

use super::email::Email;

const SIGNATURE: &str = "\n\n--\nスペースマッチ運営事務局";

fn link(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y年%m月%d日").to_string()
}

/// To the space owner when a vendor requests a booking
pub fn booking_requested(
    to: &str,
    owner_name: &str,
    vendor_name: &str,
    space_title: &str,
    date: NaiveDate,
    base_url: &str,
) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("【予約リクエスト】{space_title}"),
        text: format!(
            "{owner_name} 様\n\n{vendor_name} 様から「{space_title}」の{}の出店予約リクエストが届きました。\n\
             内容を確認し、承認または辞退してください。\n{}{SIGNATURE}",
            format_date(date),
            link(base_url, "/dashboard/bookings"),
        ),
    }
}

/// To the other party when a booking's status changes
pub fn booking_status_changed(
    to: &str,
    recipient_name: &str,
    space_title: &str,
    date: NaiveDate,
    status_label: &str,
    base_url: &str,
) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("【予約{status_label}】{space_title}"),
        text: format!(
            "{recipient_name} 様\n\n「{space_title}」{}の予約が「{status_label}」になりました。\n{}{SIGNATURE}",
            format_date(date),
            link(base_url, "/dashboard/bookings"),
        ),
    }
}

/// To the receiver of a new direct message
pub fn new_message(
    to: &str,
    receiver_name: &str,
    sender_name: &str,
    preview: &str,
    base_url: &str,
) -> Email {
    let preview: String = preview.chars().take(100).collect();
    Email {
        to: to.to_string(),
        subject: format!("{sender_name} 様から新しいメッセージが届きました"),
        text: format!(
            "{receiver_name} 様\n\n{sender_name} 様からメッセージが届きました。\n\n> {preview}\n\n{}{SIGNATURE}",
            link(base_url, "/messages"),
        ),
    }
}

/// To a user whose identity verification was reviewed
pub fn verification_decided(
    to: &str,
    name: &str,
    approved: bool,
    note: Option<&str>,
    base_url: &str,
) -> Email {
    let (subject, body) = if approved {
        (
            "【本人確認完了】本人確認が承認されました",
            "本人確認が完了しました。プロフィールに認証バッジが表示されます。",
        )
    } else {
        (
            "【本人確認】本人確認書類を確認できませんでした",
            "提出いただいた書類では本人確認ができませんでした。お手数ですが再度ご提出ください。",
        )
    };
    let note = note
        .map(|n| format!("\n\n運営からのコメント:\n{n}"))
        .unwrap_or_default();

    Email {
        to: to.to_string(),
        subject: subject.to_string(),
        text: format!(
            "{name} 様\n\n{body}{note}\n{}{SIGNATURE}",
            link(base_url, "/settings/verification"),
        ),
    }
}

/// Confirmation for a pre-launch registration
pub fn pre_registration_received(to: &str, name: Option<&str>, user_type_label: &str) -> Email {
    let greeting = name
        .map(|n| format!("{n} 様"))
        .unwrap_or_else(|| "ご登録者様".to_string());
    Email {
        to: to.to_string(),
        subject: "【事前登録完了】スペースマッチへの事前登録ありがとうございます".to_string(),
        text: format!(
            "{greeting}\n\n{user_type_label}として事前登録を受け付けました。\nサービス開始時に改めてご案内いたします。{SIGNATURE}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_requested_mentions_space_and_date() {
        let email = booking_requested(
            "owner@example.jp",
            "オーナー",
            "キッチンカー太郎",
            "駅前広場",
            NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            "https://spacematch.jp/",
        );
        assert_eq!(email.to, "owner@example.jp");
        assert!(email.subject.contains("駅前広場"));
        assert!(email.text.contains("2026年11月03日"));
        assert!(email.text.contains("https://spacematch.jp/dashboard/bookings"));
    }

    #[test]
    fn test_message_preview_is_truncated() {
        let long = "あ".repeat(500);
        let email = new_message("r@example.jp", "r", "s", &long, "http://localhost:3000");
        assert!(email.text.chars().filter(|c| *c == 'あ').count() == 100);
    }

    #[test]
    fn test_verification_rejected_includes_note() {
        let email = verification_decided("u@example.jp", "u", false, Some("画像が不鮮明です"), "");
        assert!(email.text.contains("画像が不鮮明です"));
        assert!(email.subject.contains("確認できませんでした"));
    }
}
