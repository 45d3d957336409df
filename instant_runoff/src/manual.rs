/*!

This is the long-form manual for `instant_runoff` and `livevote`.

## Counting

Each count works on a copy of the ballots cast so far:

1. The quota is `floor(ballots / 2) + 1`, over all the ballots including the
   empty ones. It does not change during the count.
2. Every ballot goes to the pile of its first preference. Empty ballots are
   set aside.
3. If a candidate holds at least the quota, they win. Otherwise the candidate
   with the smallest pile is eliminated and each of their ballots moves to the
   next preference that is still in the race. A ballot with no such
   preference is exhausted.
4. The last candidate standing wins by default.

Preferences that name an unknown candidate, or a candidate already
eliminated, are passed over.

### Ties

When several candidates share the smallest pile, the tiebreak mode decides:

* `random` (default): the tied candidates are shuffled and the first one is
  eliminated.
* `useCandidateOrder`: the tied candidate registered last is eliminated. This
  mode makes a count reproducible without a seed.

## Live elections

`livevote` reads one JSON event per line on the standard input and writes
one JSON event per line on the standard output. Events about an election
carry its `code`.

Inbound events:

```text
{"event":"create-election","candidates":[{"id":0,"name":"Anna"},{"id":1,"name":"Bob"}],"fingerprint":"f0","publicKey":"<hex>","logging":true}
{"event":"check-code","code":123456,"fingerprint":"f1"}
{"event":"cast-vote","code":123456,"fingerprint":"f1","ballot":[1,0]}
{"event":"close-election","code":123456,"signature":"<hex>"}
{"event":"organizer-disconnect","code":123456}
```

Outbound events: `assign-code`, `confirm-code` (with `valid` and the
candidates in a random order), `voter-rejected` (the voter already voted),
`winner-update` (the leader changed), `av-output` (the lines of a count, for
elections created with `logging`), `close-accepted` and `error`.

Counts are delayed by `debounceMillis` after the first ballot of a window,
so that a burst of ballots is counted once.

An election is closed by an Ed25519 signature, hex encoded, over the SHA-256
digest of the organizer fingerprint, checked with the hex encoded public key
given at creation. Invalid signatures are ignored and the election stays
open. When the organizer disconnects, the election is dropped without a
final count.

## Counting from a file

With `--input`, `livevote` counts the election in the file and exits.

### `json`

```text
{"candidates": [{"id": 0, "name": "Anna"}, {"id": 1, "name": "Bob"}],
 "ballots": [[0, 1], [1], []]}
```

### `csv`

One ballot per line, candidate ids in order of preference, no header. The
candidate names are given with `--candidate`, in the order of their ids.

```text
0,1
1
1,0
```

The summary of the rounds is written with `--out` (a path or `stdout`) and
checked against an expected summary with `--reference`.

## Configuration

`livevote` comes with sensible defaults. A JSON configuration file may be
passed with `--config`:

```text
{
  "contestName": "Class president",
  "debounceMillis": 1000,
  "rules": { "tiebreakMode": "random", "randomSeed": "42" }
}
```

- `contestName` (optional): the name in the summary. Defaults to the name of
  the input file.
- `debounceMillis` (optional, default 1000): the delay before a count.
- `rules.tiebreakMode`: `random` or `useCandidateOrder`.
- `rules.randomSeed` (optional): makes session codes, candidate shuffles and
  random tiebreaks reproducible.

 */
