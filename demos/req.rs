use anyhow::Result;
use serde_json::json;

fn main() -> Result<()> {
    let input = r#"curl \
    -X PATCH \
    -d '{"visibility":"private"}' \
    -H "Accept: application/vnd.github+json" \
    -H "Authorization: Bearer {{ token }}"\
    -b 'logged_in=yes; tz=UTC' \
    --connect-timeout 10 -L \
    https://api.github.com/user/email/visibility?source=demo "#;
    let context = json!({ "token": "abcd1234" });
    let record = curl_extract::RequestRecord::load(input, context)?;
    println!("{record:#?}");
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
