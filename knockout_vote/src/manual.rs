/*!

This is the long-form manual for `knockout_vote` and `kovote`.

## How a vote runs

Five candidates are registered, each under one of five categories (AI,
Sharing, Collaboration, Autonomy and Responsibility, Field Customer Value).
Categories may repeat. When a voter starts, the five candidates are shuffled
once into a draw order, for example:

```text
draw order: Clara, Anna, Eve, Bob, Dan
```

The vote is a survivor knockout, not a bracket:

| round   | matchup                       |
|---------|-------------------------------|
| Round 1 | Clara vs Anna                 |
| Round 2 | winner of round 1 vs Eve      |
| Round 3 | winner of round 2 vs Bob      |
| Final   | winner of round 3 vs Dan      |

The challengers are fixed by the draw, so they do not depend on the earlier
picks. Four decisions always cover all five candidates. The winner of the
final is the voter's choice and is recorded as one vote.

After each pick the interface waits for a short span (the transition guard,
600 ms by default) before showing the next matchup. Input received during
that span is dropped, not queued, so a double click counts once.

## Voter token

Each client keeps a voter token (`voter_<unix millis>_<9 base-36 chars>`),
created the first time a vote is submitted and reused afterwards. The token
is stored with the vote. It is a soft deduplication aid only: nothing checks
that a token votes once, and clearing the token file allows voting again.

## Store format

`kovote` keeps candidates and votes in a single JSON document:

```json
{
  "candidates": [
    {
      "id": "6f1c8a52-8a3e-4a43-9d0b-0d3f1f0d1c2a",
      "name": "Anna",
      "category": "AI",
      "reason": "automated the release notes",
      "created_at": "2025-12-01T09:30:00Z"
    }
  ],
  "votes": [
    {
      "winner_id": "6f1c8a52-8a3e-4a43-9d0b-0d3f1f0d1c2a",
      "category": "AI",
      "voter_token": "voter_1764581400000_k3j9x0a1b",
      "submitted_at": "2025-12-01T10:02:11Z"
    }
  ]
}
```

Category names are `AI`, `Sharing`, `Collaboration`,
`AutonomyAndResponsibility` and `FieldCustomerValue`. The localized labels
written by earlier clients are accepted when reading.

A missing store file is treated as an empty store.

## Configuration

All settings may be given on the command line. They can also be put in a
JSON file passed with `--config`; command line flags take precedence.

```json
{
  "storePath": "pride.json",
  "voterTokenPath": ".kovote_token",
  "transitionGuardMs": 600,
  "randomSeed": 42
}
```

- `storePath` (required unless `--store` is given): the JSON store.
- `voterTokenPath` (optional, default `.kovote_token`): where the token lives.
- `transitionGuardMs` (optional, default 600): the transition guard.
- `randomSeed` (optional): makes the draw reproducible. Leave it out for a
  fresh uniform shuffle on every run.

## Errors

- fewer or more than five candidates: the vote cannot start.
- the store cannot be read: the vote cannot start; run the command again.
- the vote cannot be written: the result stays on screen and the submission
  may be retried without replaying the rounds.

Nothing is retried automatically.

 */
