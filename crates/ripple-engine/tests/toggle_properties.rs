//! Property test: serialized like-toggles converge to the sequential result
//!
//! Fires an arbitrary sequence of like toggles on one post, each resolving
//! with success or failure per the script, with all speculation applied
//! optimistically and network calls serialized per entity. The final
//! liked/count pair must equal a fully-sequential application of the same
//! toggles against the simulated server.

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use ripple_core::{ApiError, CommentId, NotificationId, PostId, SessionContext, UserId};
use ripple_engine::{
    BookmarkAck, CreateCommentRequest, EngagementAck, MutationApi, OptimisticEngine,
};
use ripple_model::{CommentRecord, ModelHandle, Patch, PostState};
use std::collections::VecDeque;
use std::sync::Arc;

const INITIAL_LIKES: u32 = 10;

/// Simulated remote system: a server-side toggle that flips state and
/// reports the authoritative count, or rejects without changing anything.
struct ServerSim {
    state: Mutex<(bool, u32)>,
    script: Mutex<VecDeque<bool>>,
}

#[async_trait]
impl MutationApi for ServerSim {
    async fn create_comment(
        &self,
        _request: CreateCommentRequest,
    ) -> Result<CommentRecord, ApiError> {
        Err(ApiError::rejected("unused"))
    }

    async fn toggle_post_like(&self, _post_id: &PostId) -> Result<EngagementAck, ApiError> {
        let succeed = self.script.lock().pop_front().unwrap_or(true);
        if succeed {
            let mut state = self.state.lock();
            state.0 = !state.0;
            state.1 = if state.0 { state.1 + 1 } else { state.1 - 1 };
            Ok(EngagementAck {
                liked: state.0,
                likes_count: Some(state.1),
            })
        } else {
            Err(ApiError::rejected("scripted failure"))
        }
    }

    async fn toggle_comment_like(
        &self,
        _comment_id: &CommentId,
    ) -> Result<EngagementAck, ApiError> {
        Err(ApiError::rejected("unused"))
    }

    async fn toggle_bookmark(&self, _post_id: &PostId) -> Result<BookmarkAck, ApiError> {
        Err(ApiError::rejected("unused"))
    }

    async fn delete_comment(&self, _comment_id: &CommentId) -> Result<(), ApiError> {
        Err(ApiError::rejected("unused"))
    }

    async fn mark_notification_read(&self, _id: &NotificationId) -> Result<(), ApiError> {
        Err(ApiError::rejected("unused"))
    }
}

/// Sequential reference: apply each toggle one at a time, reverting on
/// failure, and report the final liked/count pair.
fn sequential_reference(script: &[bool]) -> (bool, u32) {
    let mut liked = false;
    let mut count = INITIAL_LIKES;
    for &succeed in script {
        if succeed {
            liked = !liked;
            count = if liked { count + 1 } else { count - 1 };
        }
    }
    (liked, count)
}

fn run_concurrent_toggles(script: Vec<bool>) -> (bool, u32) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");

    runtime.block_on(async move {
        let model = ModelHandle::new();
        let mut post = PostState::new(PostId::new("p1"));
        post.likes_count = INITIAL_LIKES;
        model.apply(Patch::HydratePost { post }).unwrap();

        let api = Arc::new(ServerSim {
            state: Mutex::new((false, INITIAL_LIKES)),
            script: Mutex::new(script.clone().into()),
        });
        let engine = Arc::new(OptimisticEngine::new(
            model.clone(),
            api,
            SessionContext::new(UserId::new("u1"), "Ada", "ada"),
        ));

        let mut tasks = Vec::new();
        for _ in &script {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                // Failures are expected; the rollback already restored state.
                let _ = engine.toggle_post_like(&PostId::new("p1")).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let post = model.post(&PostId::new("p1")).unwrap();
        (post.is_liked, post.likes_count)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn toggles_converge_to_sequential_result(script in prop::collection::vec(any::<bool>(), 1..10)) {
        let expected = sequential_reference(&script);
        let actual = run_concurrent_toggles(script);
        prop_assert_eq!(actual, expected);
    }
}
