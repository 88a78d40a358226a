use ammonia;

/// Clean user-submitted HTML using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (<b>, <p>, <blockquote>, <cite>)
/// survive, dangerous tags (<script>, <iframe>) and attributes (onclick) are
/// stripped. Post and comment bodies pass through here on every write, so
/// quoted comments keep their blockquote markup while anything executable
/// is removed before it reaches the database.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
