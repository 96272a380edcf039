// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.

use rusqlite::params;
use switchboard_core::types::ChatMessage;
use switchboard_core::SwitchboardError;

use super::{get_enum, get_ts, ts};
use crate::database::{map_tr_err, Database};

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender: get_enum(row, 2)?,
        sender_id: row.get(3)?,
        content: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), SwitchboardError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.sender.to_string(),
                    msg.sender_id,
                    msg.content,
                    ts(msg.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in chronological order.
///
/// With a `limit`, only the most recent `limit` messages are returned, still
/// oldest first.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ChatMessage>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let messages = match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender, sender_id, content, created_at
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![conversation_id, lim], from_row)?;
                    let mut newest_first = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                    newest_first.reverse();
                    newest_first
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender, sender_id, content, created_at
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id], from_row)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{at, open_db};
    use switchboard_core::types::MessageSender;

    #[tokio::test]
    async fn insert_and_list_in_order() {
        let (db, _dir) = open_db().await;
        let m1 = ChatMessage::new("c1", MessageSender::Customer, None, "hello", at(10, 0, 0));
        let m2 = ChatMessage::new("c1", MessageSender::Agent, Some("a1"), "hi", at(10, 0, 5));
        let m3 = ChatMessage::system("c2", "elsewhere", at(10, 0, 1));
        insert_message(&db, &m2).await.unwrap();
        insert_message(&db, &m1).await.unwrap();
        insert_message(&db, &m3).await.unwrap();

        let all = list_messages(&db, "c1", None).await.unwrap();
        assert_eq!(all, vec![m1, m2.clone()]);
        assert_eq!(all[1].sender_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn limit_keeps_most_recent() {
        let (db, _dir) = open_db().await;
        for i in 0..5 {
            let msg = ChatMessage::new(
                "c1",
                MessageSender::Customer,
                None,
                &format!("msg {i}"),
                at(10, 0, i),
            );
            insert_message(&db, &msg).await.unwrap();
        }

        let last_two = list_messages(&db, "c1", Some(2)).await.unwrap();
        let contents: Vec<_> = last_two.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["msg 3", "msg 4"]);
    }
}
