//! Demo handler set: a few slash commands, a text echo and three inline
//! buttons. Everything a handler can do goes through the `BotApi` it is
//! handed; nothing here touches the cursor.

use std::sync::Arc;

use async_trait::async_trait;

use embot_core::classify::{CallbackPress, Inbound};
use embot_core::dispatch::HandlerRegistry;
use embot_core::keyboard::{
    InlineKeyboardButton, InlineKeyboardMarkup, ReplyKeyboardMarkup, ReplyMarkup,
};
use embot_core::ports::{BotApi, CallbackAck, CallbackHandler, Command, CommandHandler, TextHandler};
use embot_core::Result;

pub fn stock_registry() -> HandlerRegistry {
    HandlerRegistry::new(Arc::new(CatchAllText), Arc::new(UnknownCallback))
        .command("start", Arc::new(StartCommand))
        .command("help", Arc::new(HelpCommand))
        .command("keyboard", Arc::new(KeyboardCommand))
        .command("inline", Arc::new(InlineCommand))
        .command("echo", Arc::new(EchoCommand))
        .callback(
            "search",
            Arc::new(CannedCallback {
                ack: CallbackAck::alert("🔍 Search in progress..."),
                reply: "🔍 **Search results:**\n\n✅ Found: 1 result\n⏱️ Search time: 0.1 sec\n📄 Type: text document\n\n_Search completed successfully!_",
            }),
        )
        .callback(
            "notes",
            Arc::new(CannedCallback {
                ack: CallbackAck::notice("📝 Loading notes..."),
                reply: "📝 **Your notes:**\n\n📌 Note 1: Shopping\n   _Milk, bread, eggs_\n\n📌 Note 2: Meetings\n   _Tomorrow at 15:00_\n\n📌 Note 3: Ideas\n   _New project_\n\n💡 Total notes: 3",
            }),
        )
        .callback(
            "contacts",
            Arc::new(CannedCallback {
                ack: CallbackAck::notice("📞 Loading contacts..."),
                reply: "📞 **Support contacts:**\n\n📱 Phone: +7 (999) 123-45-67\n📧 Email: support@example.com\n🤖 Telegram: @support_bot\n\n⏰ Working hours: 24/7\n\n_Feel free to reach out anytime!_",
            }),
        )
}

struct StartCommand;

#[async_trait]
impl CommandHandler for StartCommand {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()> {
        let who = cmd
            .from
            .map(|u| u.0.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let markup = ReplyMarkup::Keyboard(ReplyKeyboardMarkup::new(vec![
            vec!["ℹ️ Info", "🔧 Settings"],
            vec!["📊 Statistics", "❓ Help"],
            vec!["🎮 Games", "📱 Profile"],
        ]));
        api.send_message(
            cmd.chat,
            &format!("Hi! I'm a bot in the Telegram emulator. Your ID: {who}"),
            Some(&markup),
        )
        .await
    }
}

struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()> {
        api.send_message(
            cmd.chat,
            "Available commands:\n/start - Start with keyboard\n/help - Help\n/echo <text> - Echo\n/keyboard - Show keyboard\n/inline - Show inline keyboard",
            None,
        )
        .await
    }
}

struct KeyboardCommand;

#[async_trait]
impl CommandHandler for KeyboardCommand {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()> {
        let markup = ReplyMarkup::Keyboard(ReplyKeyboardMarkup::new(vec![
            vec!["Button 1", "Button 2"],
            vec!["Button 3"],
        ]));
        api.send_message(cmd.chat, "Here is a regular keyboard:", Some(&markup))
            .await
    }
}

struct InlineCommand;

#[async_trait]
impl CommandHandler for InlineCommand {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()> {
        let markup = ReplyMarkup::Inline(InlineKeyboardMarkup::new(vec![
            vec![
                InlineKeyboardButton::callback("🔍 Search", "search"),
                InlineKeyboardButton::callback("📝 Notes", "notes"),
            ],
            vec![
                InlineKeyboardButton::link("🌐 Website", "https://example.com"),
                InlineKeyboardButton::callback("📞 Contacts", "contacts"),
            ],
        ]));
        api.send_message(cmd.chat, "Here is an inline keyboard:", Some(&markup))
            .await
    }
}

struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()> {
        api.send_message(cmd.chat, &format!("Echo: {}", cmd.args), None)
            .await
    }
}

struct CatchAllText;

#[async_trait]
impl TextHandler for CatchAllText {
    async fn handle(&self, api: &dyn BotApi, msg: &Inbound) -> Result<()> {
        api.send_message(msg.chat, &format!("You wrote: {}", msg.text), None)
            .await
    }
}

/// Inline button with a fixed acknowledgement and reply.
struct CannedCallback {
    ack: CallbackAck,
    reply: &'static str,
}

#[async_trait]
impl CallbackHandler for CannedCallback {
    fn ack(&self, _press: &CallbackPress) -> CallbackAck {
        self.ack.clone()
    }

    async fn handle(&self, api: &dyn BotApi, press: &CallbackPress) -> Result<()> {
        let Some(chat) = press.chat else {
            return Ok(());
        };
        api.send_message(chat, self.reply, None).await
    }
}

/// Fallback for button data no handler is registered for.
struct UnknownCallback;

#[async_trait]
impl CallbackHandler for UnknownCallback {
    fn ack(&self, press: &CallbackPress) -> CallbackAck {
        CallbackAck::notice(format!("❓ Unknown command: {}", press.data))
    }

    async fn handle(&self, api: &dyn BotApi, press: &CallbackPress) -> Result<()> {
        let Some(chat) = press.chat else {
            return Ok(());
        };
        api.send_message(
            chat,
            &format!(
                "❓ **Unknown command:**\n\n🔍 Received: `{}`\n⚠️ This command is not handled\n\n💡 Try other buttons or the `/help` command",
                press.data
            ),
            None,
        )
        .await
    }
}
