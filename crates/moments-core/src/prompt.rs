//! Persona and instruction prompts, rendered with `minijinja`.
//!
//! Built-in templates cover the persona context plus the three
//! instructions the scheduler issues (new post, comment on a post, reply
//! to a comment). Operators can override any of them by dropping
//! `persona.j2`, `post.j2`, `comment.j2`, or `reply.j2` into a directory
//! and loading it with [`Prompts::from_dir`].

use std::path::Path;

use minijinja::{Environment, context};
use moments_types::{Agent, Comment, Post};

use crate::error::SchedulerError;

const PERSONA_TEMPLATE: &str = "\
You are {{ name }}, a person sharing moments from daily life on a social feed.
{%- if personality %}
Personality and interests: {{ personality }}
{%- endif %}
Stay in character. Never mention that you are an AI.";

const POST_TEMPLATE: &str = "\
Write a short social feed post about something from your day, a thought, \
or one of your interests. One to three sentences, casual tone, at most one \
emoji. Output only the post text.";

const COMMENT_TEMPLATE: &str = "\
{{ author }} posted on the feed:
\"{{ post }}\"

Write a short, natural comment on this post as yourself. One sentence. \
Output only the comment text.";

const REPLY_TEMPLATE: &str = "\
You posted on the feed:
\"{{ post }}\"

{{ commenter }} commented:
\"{{ comment }}\"

Write a short, friendly reply to this comment. One sentence. Output only \
the reply text.";

/// Template names and their built-in sources.
const BUILTIN: [(&str, &str); 4] = [
    ("persona", PERSONA_TEMPLATE),
    ("post", POST_TEMPLATE),
    ("comment", COMMENT_TEMPLATE),
    ("reply", REPLY_TEMPLATE),
];

/// Prompt renderer holding the persona and instruction templates.
#[derive(Debug)]
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    /// Prompts using only the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, SchedulerError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN {
            env.add_template(name, source).map_err(|e| {
                SchedulerError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Built-in templates, overridden by any `<name>.j2` file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if an override exists but cannot
    /// be read or compiled.
    pub fn from_dir(dir: &Path) -> Result<Self, SchedulerError> {
        let mut prompts = Self::builtin()?;
        for (name, _) in BUILTIN {
            let path = dir.join(format!("{name}.j2"));
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                SchedulerError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            prompts.env.add_template_owned(name, source).map_err(|e| {
                SchedulerError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(prompts)
    }

    /// Persona context for `agent`.
    ///
    /// The agent's display name is always present in the result, even if
    /// an override template forgets to include it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if rendering fails.
    pub fn persona(&self, agent: &Agent) -> Result<String, SchedulerError> {
        let rendered = self.render(
            "persona",
            context! { name => agent.name, personality => agent.personality },
        )?;
        if rendered.contains(&agent.name) {
            Ok(rendered)
        } else {
            Ok(format!("You are {}.\n{rendered}", agent.name))
        }
    }

    /// Instruction for a new post.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if rendering fails.
    pub fn post(&self) -> Result<String, SchedulerError> {
        self.render("post", context! {})
    }

    /// Instruction for commenting on `post`, written by `author`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if rendering fails.
    pub fn comment(&self, author: &str, post: &Post) -> Result<String, SchedulerError> {
        self.render("comment", context! { author => author, post => post.content })
    }

    /// Instruction for replying to `comment` on the agent's own `post`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if rendering fails.
    pub fn reply(
        &self,
        commenter: &str,
        post: &Post,
        comment: &Comment,
    ) -> Result<String, SchedulerError> {
        self.render(
            "reply",
            context! { commenter => commenter, post => post.content, comment => comment.content },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, SchedulerError> {
        self.env
            .get_template(name)
            .map_err(|e| SchedulerError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| SchedulerError::Template(format!("{name} render failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use moments_types::{AgentId, Comment};

    use super::*;

    fn mia() -> Agent {
        Agent::autonomous("Mia", "film photography, night markets")
    }

    #[test]
    fn persona_includes_name_and_personality() {
        let prompts = Prompts::builtin();
        assert!(prompts.is_ok());
        let Ok(prompts) = prompts else { return };

        let persona = prompts.persona(&mia()).unwrap_or_default();
        assert!(persona.contains("Mia"));
        assert!(persona.contains("film photography"));
    }

    #[test]
    fn persona_without_personality_omits_interest_line() {
        let Ok(prompts) = Prompts::builtin() else { return };
        let agent = Agent::autonomous("Ken", "");
        let persona = prompts.persona(&agent).unwrap_or_default();
        assert!(persona.contains("Ken"));
        assert!(!persona.contains("Personality"));
    }

    #[test]
    fn comment_and_reply_embed_context() {
        let Ok(prompts) = Prompts::builtin() else { return };
        let post = Post::new(AgentId::new(), "Rainy Sunday, new noodle place");
        let comment = Comment::top_level(AgentId::new(), "which one?");

        let comment_prompt = prompts.comment("Ken", &post).unwrap_or_default();
        assert!(comment_prompt.contains("Ken"));
        assert!(comment_prompt.contains("noodle place"));

        let reply_prompt = prompts.reply("Sam", &post, &comment).unwrap_or_default();
        assert!(reply_prompt.contains("Sam"));
        assert!(reply_prompt.contains("which one?"));
    }

    #[test]
    fn override_directory_replaces_template_and_keeps_name() {
        let dir = std::env::temp_dir().join(format!(
            "moments_prompt_override_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        ));
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("persona.j2"), "Speak like a pirate.").ok();
        std::fs::write(dir.join("post.j2"), "Post about the sea.").ok();

        let prompts = Prompts::from_dir(&dir);
        assert!(prompts.is_ok());
        let Ok(prompts) = prompts else { return };

        let persona = prompts.persona(&mia()).unwrap_or_default();
        assert!(persona.starts_with("You are Mia."));
        assert!(persona.contains("pirate"));
        assert_eq!(prompts.post().unwrap_or_default(), "Post about the sea.");

        std::fs::remove_dir_all(&dir).ok();
    }
}
