//! Demo conversations used to seed the store at startup.

use chrono::{DateTime, Duration, Utc};

use crate::core::errors::TradenomixResult;
use crate::core::ids::{ConversationId, IdentityId, MessageId};
use crate::messaging::types::{Conversation, Message};

/// Participant id of the signed-in demo user.
pub const SELF_PARTICIPANT: &str = "you";

/// (conversation id, counterpart, [(sender is self, content)])
const SEED: &[(&str, &str, &[(bool, &str)])] = &[
    (
        "1",
        "Alex",
        &[
            (false, "Hey! How’s the algo trading going?"),
            (true, "Pretty solid. Backtested a new strategy today."),
            (false, "Catch you later!"),
        ],
    ),
    (
        "2",
        "Samantha",
        &[
            (true, "Just entered a trade on BTC/USD"),
            (false, "Nice! What’s your target?"),
            (true, "Looking at 5% gain if it runs well."),
            (false, "That’s exciting 🚀"),
        ],
    ),
    (
        "3",
        "Marcus",
        &[
            (false, "Bro, did you see the NASDAQ today?"),
            (true, "Yeah, insane volatility. Perfect for scalps."),
            (false, "Yep, risk/reward matters most."),
        ],
    ),
    (
        "4",
        "Elena",
        &[
            (false, "How’s your gold position holding up?"),
            (true, "Stopped out earlier, small loss tho."),
            (false, "Good discipline 👌"),
            (true, "Let’s compare notes tomorrow."),
        ],
    ),
    (
        "5",
        "Daniel",
        &[
            (false, "Think ETH will breakout soon?"),
            (true, "Possibly, but I’m waiting for confirmation."),
            (false, "Alright, goodnight!"),
        ],
    ),
];

/// Build the seed conversations. The newest message of the first conversation is
/// stamped `now`; each later conversation is one hour older, and messages within
/// a conversation are one minute apart.
///
/// # Errors
/// Returns an error if a seed identifier fails validation.
pub fn seed_conversations(now: DateTime<Utc>) -> TradenomixResult<Vec<Conversation>> {
    let me = IdentityId::new(SELF_PARTICIPANT)?;
    let mut conversations = Vec::with_capacity(SEED.len());

    for (hours_ago, (id, counterpart, lines)) in (0_i64..).zip(SEED.iter()) {
        let other = IdentityId::new(counterpart)?;
        let newest = now - Duration::hours(hours_ago);
        let mut conversation = Conversation {
            id: ConversationId::new(id)?,
            participants: vec![me.clone(), other.clone()],
            last_message: String::new(),
            last_message_at: newest,
            messages: Vec::with_capacity(lines.len()),
        };

        for (index, (from_self, content)) in (1_i64..).zip(lines.iter()) {
            let minutes_before = i64::try_from(lines.len()).unwrap_or(i64::MAX) - index;
            conversation.push(Message {
                id: MessageId::new(format!("m{index}"))?,
                sender_id: if *from_self { me.clone() } else { other.clone() },
                content: (*content).to_string(),
                created_at: newest - Duration::minutes(minutes_before),
            });
        }

        conversations.push(conversation);
    }

    Ok(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_preview_matches_last_message() {
        let conversations = seed_conversations(Utc::now()).unwrap();
        assert_eq!(conversations.len(), 5);
        for conversation in &conversations {
            assert_eq!(conversation.participants.len(), 2);
            let last = conversation.messages.last().unwrap();
            assert_eq!(conversation.last_message, last.content);
            assert_eq!(conversation.last_message_at, last.created_at);
        }
        assert_eq!(conversations[1].last_message, "That’s exciting 🚀");
    }

    #[test]
    fn test_seed_messages_are_chronological() {
        let conversations = seed_conversations(Utc::now()).unwrap();
        for conversation in conversations {
            assert!(
                conversation
                    .messages
                    .windows(2)
                    .all(|pair| pair[0].created_at < pair[1].created_at)
            );
        }
    }
}
